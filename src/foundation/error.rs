pub type SlidereelResult<T> = Result<T, SlidereelError>;

#[derive(thiserror::Error, Debug)]
pub enum SlidereelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidereelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SlidereelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            SlidereelError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
        assert!(
            SlidereelError::asset("x")
                .to_string()
                .contains("asset error:")
        );
        assert!(
            SlidereelError::persistence("x")
                .to_string()
                .contains("persistence error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SlidereelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
