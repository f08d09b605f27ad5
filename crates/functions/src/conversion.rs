use cty_core::{convert, CtyError, Type, Value};

pub fn to_string(value: &Value) -> Result<Value, CtyError> {
    convert_to("to_string", value, Type::String)
}

pub fn to_number(value: &Value) -> Result<Value, CtyError> {
    convert_to("to_number", value, Type::Number)
}

pub fn to_bool(value: &Value) -> Result<Value, CtyError> {
    convert_to("to_bool", value, Type::Bool)
}

/// Nulls and unknowns convert to a null or unknown of `target`.
fn convert_to(name: &str, value: &Value, target: Type) -> Result<Value, CtyError> {
    convert(value, &target).map_err(|e| CtyError::function(name, e.message()))
}
