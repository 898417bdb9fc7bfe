#[cfg(test)]
pub mod test {
    use crate::metadata::{MetadataRegistry, ParameterMetadata, SettingsClass, SettingsMetadata};
    use crate::settings::Settings;
    use crate::value::{ObjectValue, ParameterValue};

    /// Duplicable parameter data.
    #[derive(Debug, Clone, PartialEq)]
    pub struct City(pub String);

    /// Parameter data without structural duplication.
    #[derive(Debug)]
    pub struct Connection(pub u32);

    pub fn city(name: &str) -> ParameterValue {
        ParameterValue::Object(ObjectValue::new(City(name.to_string())))
    }

    pub fn city_of(settings: &Settings) -> ObjectValue {
        settings
            .parameter("city")
            .unwrap()
            .as_object()
            .cloned()
            .unwrap()
    }

    /// `Profile { name (not cloneable), address: Address }`, `Address { city }`.
    pub fn profile_registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Profile")
                    .parameter(ParameterMetadata::new("name").cloneable(false))
                    .embed("address", "Address"),
            ))
            .unwrap()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Address").parameter(ParameterMetadata::new("city")),
            ))
            .unwrap()
    }

    pub fn profile(name: &str, city_name: &str) -> Settings {
        let address = Settings::bare("Address");
        address.set_parameter("city", city(city_name)).unwrap();
        let profile = Settings::bare("Profile");
        profile.set_parameter("name", name).unwrap();
        profile.set_embedded("address", address).unwrap();
        profile
    }

    /// `Node { label, next: Node }`.
    pub fn node_registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Node")
                    .parameter(ParameterMetadata::new("label"))
                    .embed("next", "Node"),
            ))
            .unwrap()
    }

    /// `A { value, b: B }`, `B { value, a: A }`.
    pub fn cycle_registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("A")
                    .parameter(ParameterMetadata::new("value"))
                    .embed("b", "B"),
            ))
            .unwrap()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("B")
                    .parameter(ParameterMetadata::new("value"))
                    .embed("a", "A"),
            ))
            .unwrap()
    }

    pub fn cycle(a_value: i64, b_value: i64) -> (Settings, Settings) {
        let a = Settings::bare("A");
        let b = Settings::bare("B");
        a.set_parameter("value", a_value).unwrap();
        b.set_parameter("value", b_value).unwrap();
        a.set_embedded("b", b.clone()).unwrap();
        b.set_embedded("a", a.clone()).unwrap();
        (a, b)
    }

    /// `Root { left: Left, right: Right }`, both sides embed `Shared { value }`.
    pub fn diamond_registry() -> MetadataRegistry {
        MetadataRegistry::new()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Root")
                    .embed("left", "Left")
                    .embed("right", "Right"),
            ))
            .unwrap()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Left").embed("shared", "Shared"),
            ))
            .unwrap()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Right").embed("shared", "Shared"),
            ))
            .unwrap()
            .with_class(SettingsClass::new(
                SettingsMetadata::new("Shared").parameter(ParameterMetadata::new("value")),
            ))
            .unwrap()
    }

    /// A diamond where `left.shared` and `right.shared` are separate instances.
    pub fn diamond(left_value: i64, right_value: i64) -> Settings {
        let left_shared = Settings::bare("Shared");
        left_shared.set_parameter("value", left_value).unwrap();
        let right_shared = Settings::bare("Shared");
        right_shared.set_parameter("value", right_value).unwrap();

        let left = Settings::bare("Left");
        left.set_embedded("shared", left_shared).unwrap();
        let right = Settings::bare("Right");
        right.set_embedded("shared", right_shared).unwrap();

        let root = Settings::bare("Root");
        root.set_embedded("left", left).unwrap();
        root.set_embedded("right", right).unwrap();
        root
    }

    pub const PROFILE_SCHEMA: &str = r#"
[classes.Profile]
parameters = [
    { property = "name", cloneable = false, type = "string" },
    { property = "ratio", type = "float" },
]
embedded = [{ property = "address", target = "Address" }]

[classes.Address]
parameters = [{ property = "city" }]
"#;
}
