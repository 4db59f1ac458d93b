// Test prelude - provides a macro to bring the crate's mqtt module into scope.

macro_rules! setup_mqtt_for_test {
    ($module_name:ident) => {
        use mqtt_protocol_core::mqtt;
    };
}
