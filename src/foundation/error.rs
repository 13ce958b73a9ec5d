pub type StrataResult<T> = Result<T, StrataError>;

#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset load error for '{source_ref}': {reason}")]
    AssetLoad { source_ref: String, reason: String },

    #[error("packaging error: {0}")]
    Packaging(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_load(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }

    pub fn packaging(msg: impl Into<String>) -> Self {
        Self::Packaging(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StrataError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            StrataError::packaging("x")
                .to_string()
                .contains("packaging error:")
        );
    }

    #[test]
    fn asset_load_names_the_source() {
        let err = StrataError::asset_load("hats/cap.png", "decode failed");
        let msg = err.to_string();
        assert!(msg.contains("hats/cap.png"));
        assert!(msg.contains("decode failed"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StrataError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
