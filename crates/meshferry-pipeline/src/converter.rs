//! The conversion stage as seen by the orchestrator.

use async_trait::async_trait;
use meshferry_blender::{
    BlenderConverter, BlenderInstallation, ConversionError, ConversionRequest, ConversionResult,
    LocateError,
};

/// Converts a glTF file into an FBX.
#[async_trait]
pub trait MeshConverter: Send + Sync {
    /// Find the conversion tool without running it.
    fn locate_tool(&self) -> Result<BlenderInstallation, LocateError>;

    /// Run one conversion.
    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, ConversionError>;
}

#[async_trait]
impl MeshConverter for BlenderConverter {
    fn locate_tool(&self) -> Result<BlenderInstallation, LocateError> {
        self.locate()
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, ConversionError> {
        BlenderConverter::convert(self, request).await
    }
}
