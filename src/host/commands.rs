use crate::error::CommandError;

use nalgebra::Vector3;
use serde_json::{json, Map, Value};

/// Named request issued by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Start a session with the given options
    Init(Map<String, Value>),
    SetIsRecording(bool),
    Dispose,
    CameraPosition,
}

impl HostCommand {
    /// Parse a method name and its arguments
    pub fn parse(method: &str, arguments: &Value) -> Result<Self, CommandError> {
        match method {
            "init" => match arguments {
                Value::Null => Ok(HostCommand::Init(Map::new())),
                Value::Object(options) => Ok(HostCommand::Init(options.clone())),
                other => Err(invalid(method, "options", format!("expected object, got {}", other))),
            },
            "setIsRecording" => {
                let flag = match arguments {
                    Value::Bool(flag) => Some(*flag),
                    Value::Object(options) => options.get("isRecording").and_then(Value::as_bool),
                    _ => None,
                };
                flag.map(HostCommand::SetIsRecording)
                    .ok_or_else(|| invalid(method, "isRecording", "expected boolean".to_string()))
            }
            "dispose" => Ok(HostCommand::Dispose),
            "cameraPosition" => Ok(HostCommand::CameraPosition),
            other => Err(CommandError::NotImplemented {
                method: other.to_string(),
            }),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            HostCommand::Init(_) => "init",
            HostCommand::SetIsRecording(_) => "setIsRecording",
            HostCommand::Dispose => "dispose",
            HostCommand::CameraPosition => "cameraPosition",
        }
    }
}

fn invalid(method: &str, argument: &str, details: String) -> CommandError {
    CommandError::InvalidArgument {
        method: method.to_string(),
        argument: argument.to_string(),
        details,
    }
}

/// Reply returned to the host for a command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    None,
    CameraPosition(Option<Vector3<f64>>),
}

impl CommandResponse {
    pub fn to_value(&self) -> Value {
        match self {
            CommandResponse::None => Value::Null,
            CommandResponse::CameraPosition(Some(position)) => {
                json!([position.x, position.y, position.z])
            }
            CommandResponse::CameraPosition(None) => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(
            HostCommand::parse("init", &json!({"planeDetection": 1})).unwrap(),
            HostCommand::Init(json!({"planeDetection": 1}).as_object().unwrap().clone())
        );
        assert_eq!(
            HostCommand::parse("init", &Value::Null).unwrap(),
            HostCommand::Init(Map::new())
        );
        assert_eq!(
            HostCommand::parse("setIsRecording", &json!(true)).unwrap(),
            HostCommand::SetIsRecording(true)
        );
        assert_eq!(
            HostCommand::parse("setIsRecording", &json!({"isRecording": false})).unwrap(),
            HostCommand::SetIsRecording(false)
        );
        assert_eq!(HostCommand::parse("dispose", &Value::Null).unwrap(), HostCommand::Dispose);
        assert_eq!(
            HostCommand::parse("cameraPosition", &Value::Null).unwrap().method(),
            "cameraPosition"
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            HostCommand::parse("snapshot", &Value::Null),
            Err(CommandError::NotImplemented { method }) if method == "snapshot"
        ));
        assert!(matches!(
            HostCommand::parse("setIsRecording", &json!("yes")),
            Err(CommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            HostCommand::parse("init", &json!([1, 2])),
            Err(CommandError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_camera_position_response() {
        let response = CommandResponse::CameraPosition(Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(response.to_value(), json!([1.0, 2.0, 3.0]));
        assert_eq!(CommandResponse::CameraPosition(None).to_value(), Value::Null);
    }
}
