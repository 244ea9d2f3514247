/// One in-process unit of the stage chain.
/// - `block` is interleaved s16le stereo PCM and is rewritten in place.
/// - process() runs on the stage worker; it must not reorder or hold back bytes.
pub trait Stage: Send {
    fn name(&self) -> &'static str;
    fn process(&mut self, block: &mut [u8]);
}
