use crate::descriptor::DescriptorError;

/// Everything that can end a positioning session
///
/// All variants are terminal: once one is raised the session stops placing and
/// tracking objects and only displays the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Location service disabled, please enable it.")]
    SensorPermission,

    #[error("Location service timed out.")]
    SensorTimeout,

    #[error("Unable to determine device location.")]
    SensorFailure,

    #[error("{0}")]
    Transport(String),

    #[error("Request to '{url}' received empty text.")]
    EmptyResponse { url: String },

    #[error(transparent)]
    DescriptorSyntax(#[from] DescriptorError),

    #[error("{}bad tag: {tag}", line_prefix(.line))]
    UnresolvedTag { tag: String, line: Option<String> },

    #[error("Instantiating {what} failed.")]
    Instantiation { what: String },

    #[error("No augments at your location.")]
    EmptyPlacement,
}

impl EngineError {
    pub(crate) fn unresolved(tag: &str, line: &str) -> Self {
        EngineError::UnresolvedTag {
            tag: tag.to_string(),
            line: Some(line.to_string()),
        }
    }
}

fn line_prefix(line: &Option<String>) -> String {
    match line {
        Some(line) => format!("line '{line}', "),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            EngineError::unresolved("Cube", "ABS,Cube,c,1,2,3").to_string(),
            "line 'ABS,Cube,c,1,2,3', bad tag: Cube"
        );
        assert_eq!(
            EngineError::UnresolvedTag {
                tag: "SceneAnchor".into(),
                line: None
            }
            .to_string(),
            "bad tag: SceneAnchor"
        );
        assert_eq!(
            EngineError::EmptyPlacement.to_string(),
            "No augments at your location."
        );
    }

    #[test]
    fn test_descriptor_error_is_transparent() {
        let err: EngineError = DescriptorError::UnknownCommand {
            line: "X".into(),
            token: "X".into(),
        }
        .into();
        assert_eq!(err.to_string(), "line 'X', bad command: X");
    }
}
