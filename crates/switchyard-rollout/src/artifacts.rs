//! ArtifactPipeline: builds and pushes the images for both backends.
//!
//! Both variants are built together so a later backend switch never
//! waits on a build. Images are tagged with the first 12 hex digits of
//! the source hash.

use std::sync::Arc;

use switchyard_core::provider::{ArtifactBuilder, ImageVariant};
use switchyard_core::{ArtifactRefs, DeploymentRecord};
use tracing::{debug, info};

use crate::context::DeployContext;
use crate::error::DeployError;

const TAG_LEN: usize = 12;

pub struct ArtifactPipeline {
    builder: Arc<dyn ArtifactBuilder>,
}

impl ArtifactPipeline {
    pub fn new(builder: Arc<dyn ArtifactBuilder>) -> Self {
        Self { builder }
    }

    /// Build and push when the source changed, an image is missing, or
    /// `force` is set. Returns true if anything was pushed.
    pub async fn ensure(
        &self,
        ctx: &DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<bool, DeployError> {
        let container = &ctx.spec.name;
        if !(ctx.force || ctx.changes.code_changed || ctx.changes.images_missing) {
            debug!(%container, "artifacts up to date");
            return Ok(false);
        }
        if !ctx.force && is_current(&record.artifacts, &ctx.source_hash) {
            info!(%container, "reusing images built from this source");
            return Ok(false);
        }

        let repository = self.builder.repository(&ctx.resource_name()).await?;
        let tag = &ctx.source_hash[..ctx.source_hash.len().min(TAG_LEN)];
        let orchestrated_image = format!("{repository}:{tag}");
        let function_image = format!("{repository}:{tag}-function");

        for (image, variant) in [
            (&orchestrated_image, ImageVariant::Orchestrated),
            (&function_image, ImageVariant::Function),
        ] {
            ctx.check_cancelled()?;
            info!(%container, %image, ?variant, "building image");
            self.builder.build(&ctx.source_dir, image, variant).await?;
            self.builder.push(image).await?;
            let size_mb = self.builder.size_mb(image).await?;
            info!(%container, %image, size_mb, "image pushed");
        }

        record.artifacts = ArtifactRefs {
            repository: Some(repository),
            orchestrated_image: Some(orchestrated_image),
            function_image: Some(function_image),
            built_from_hash: Some(ctx.source_hash.clone()),
        };
        ctx.checkpoint.save(record, "artifacts")?;
        Ok(true)
    }
}

fn is_current(artifacts: &ArtifactRefs, source_hash: &str) -> bool {
    artifacts.complete() && artifacts.built_from_hash.as_deref() == Some(source_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_artifacts_are_never_current() {
        let artifacts = ArtifactRefs {
            repository: Some("repo".to_string()),
            orchestrated_image: Some("repo:abc".to_string()),
            function_image: None,
            built_from_hash: Some("abc".to_string()),
        };
        assert!(!is_current(&artifacts, "abc"));
    }

    #[test]
    fn complete_artifacts_match_on_hash() {
        let artifacts = ArtifactRefs {
            repository: Some("repo".to_string()),
            orchestrated_image: Some("repo:abc".to_string()),
            function_image: Some("repo:abc-function".to_string()),
            built_from_hash: Some("abc".to_string()),
        };
        assert!(is_current(&artifacts, "abc"));
        assert!(!is_current(&artifacts, "def"));
    }
}
