use lumen_assets::AssetError;
use lumen_common::{ProgramId, ShaderStage};
use std::fmt;
use std::path::PathBuf;

/// Errors from building or using GPU resources.
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    ProgramLink { log: String },
    #[error("failed to decode image {}: {reason}", path.display())]
    ImageDecode { path: PathBuf, reason: String },
    #[error("uniform '{name}' not found in {program}")]
    UniformNotFound { program: ProgramId, name: String },
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// A resource whose creation failed but whose handle is still allocated.
///
/// Callers either give up (`into_error`) or keep the unusable resource
/// (`into_resource`) and carry on.
pub struct Degraded<T> {
    resource: T,
    error: GfxError,
}

impl<T> Degraded<T> {
    pub fn new(resource: T, error: GfxError) -> Self {
        Self { resource, error }
    }

    pub fn error(&self) -> &GfxError {
        &self.error
    }

    pub fn resource(&self) -> &T {
        &self.resource
    }

    /// Keep the resource, discarding the error.
    pub fn into_resource(self) -> T {
        self.resource
    }

    /// Keep the error. The resource is dropped, releasing its handle.
    pub fn into_error(self) -> GfxError {
        self.error
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Degraded<U> {
        Degraded {
            resource: f(self.resource),
            error: self.error,
        }
    }
}

impl<T> fmt::Debug for Degraded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Degraded")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Degraded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "degraded resource: {}", self.error)
    }
}

impl<T> std::error::Error for Degraded<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Log a creation failure and continue with the resource.
pub fn tolerate<T>(result: Result<T, Degraded<T>>) -> T {
    match result {
        Ok(resource) => resource,
        Err(degraded) => {
            tracing::error!("{}; continuing with unusable resource", degraded.error);
            degraded.into_resource()
        }
    }
}

/// How recoverable failures are treated: uniform lookup misses and resources
/// that failed to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log and continue. Uniform misses are no-ops.
    #[default]
    Tolerant,
    /// Fail on the first problem.
    Strict,
}

impl ErrorPolicy {
    /// Turn a creation result into a plain result according to the policy.
    pub fn resolve<T>(self, result: Result<T, Degraded<T>>) -> Result<T, GfxError> {
        match self {
            ErrorPolicy::Tolerant => Ok(tolerate(result)),
            ErrorPolicy::Strict => result.map_err(Degraded::into_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> Result<u32, Degraded<u32>> {
        Err(Degraded::new(
            7,
            GfxError::ProgramLink {
                log: "missing fragment stage".into(),
            },
        ))
    }

    #[test]
    fn tolerant_keeps_the_resource() {
        assert_eq!(ErrorPolicy::Tolerant.resolve(failed()).unwrap(), 7);
    }

    #[test]
    fn strict_surfaces_the_log() {
        let err = ErrorPolicy::Strict.resolve(failed()).unwrap_err();
        assert!(err.to_string().contains("missing fragment stage"));
    }

    #[test]
    fn success_passes_through_both_policies() {
        assert_eq!(ErrorPolicy::Strict.resolve(Ok::<_, Degraded<u32>>(1)).unwrap(), 1);
        assert_eq!(ErrorPolicy::Tolerant.resolve(Ok::<_, Degraded<u32>>(1)).unwrap(), 1);
    }

    #[test]
    fn shader_error_names_stage() {
        let err = GfxError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "expected ';'".into(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: expected ';'"
        );
    }
}
