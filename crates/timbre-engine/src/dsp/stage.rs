use super::effect::Stage;
use super::processor::ChannelProcessor;
use super::sample::FRAME_BYTES;

/// Runs a [`ChannelProcessor`] over every complete frame of a block.
///
/// A trailing partial frame is left as it is.
pub struct EffectStage {
    processor: ChannelProcessor,
}

impl EffectStage {
    pub fn new(processor: ChannelProcessor) -> Self {
        Self { processor }
    }
}

impl Stage for EffectStage {
    fn name(&self) -> &'static str {
        self.processor.name()
    }

    fn process(&mut self, block: &mut [u8]) {
        for frame in block.chunks_exact_mut(FRAME_BYTES) {
            self.processor.process_frame(frame);
        }
    }
}
