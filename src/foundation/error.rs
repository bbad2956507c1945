pub type CompositorResult<T> = Result<T, CompositorError>;

#[derive(thiserror::Error, Debug)]
pub enum CompositorError {
    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("region analysis failure: {0}")]
    RegionAnalysis(String),

    #[error("compositor has been destroyed")]
    Destroyed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositorError {
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    pub fn region_analysis(msg: impl Into<String>) -> Self {
        Self::RegionAnalysis(msg.into())
    }

    /// Wrap an `anyhow` chain from the loader as a decode failure, keeping every context layer.
    pub(crate) fn decode_chain(err: anyhow::Error) -> Self {
        Self::ImageDecode(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CompositorError::invalid_source("x")
                .to_string()
                .contains("invalid source:")
        );
        assert!(
            CompositorError::image_decode("x")
                .to_string()
                .contains("image decode error:")
        );
        assert!(
            CompositorError::region_analysis("x")
                .to_string()
                .contains("region analysis failure:")
        );
        assert!(CompositorError::Destroyed.to_string().contains("destroyed"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CompositorError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn decode_chain_keeps_context() {
        let err = anyhow::anyhow!("bad magic").context("decode image from memory");
        let msg = CompositorError::decode_chain(err).to_string();
        assert!(msg.contains("decode image from memory"));
        assert!(msg.contains("bad magic"));
    }
}
