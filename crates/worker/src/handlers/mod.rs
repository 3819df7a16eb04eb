pub mod txt2img;

use std::sync::Arc;

use lumen_core::txt2img::JOB_TYPE_TXT2IMG;
use lumen_queue::handler::DuplicateHandler;
use lumen_queue::HandlerRegistry;
use lumen_sdapi::SdApi;

pub use txt2img::Txt2ImgHandler;

/// Registry with every handler this worker serves.
pub fn registry(api: SdApi) -> Result<HandlerRegistry, DuplicateHandler> {
    let mut registry = HandlerRegistry::new();
    registry.register(JOB_TYPE_TXT2IMG, Arc::new(Txt2ImgHandler::new(api)))?;
    Ok(registry)
}
