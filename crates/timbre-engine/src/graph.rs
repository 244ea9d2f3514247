use crate::dsp::effect::Stage;
use crate::dsp::sample::FRAME_BYTES;

/// A serial chain of in-process stages. Owns the stages.
pub struct Chain {
    stages: Vec<Box<dyn Stage>>,
}

impl Chain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Process one block in place through every stage, in push order.
    pub fn process(&mut self, block: &mut [u8]) {
        for stage in self.stages.iter_mut() {
            stage.process(block);
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-cuts arbitrary pipe reads into whole stereo frames.
///
/// Bytes past the last complete frame are held back and put in front of the
/// next chunk, so every stage sees left and right samples where it expects them.
#[derive(Debug, Default)]
pub struct FrameAligner {
    carry: Vec<u8>,
}

impl FrameAligner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn align(&mut self, chunk: Vec<u8>) -> Vec<u8> {
        let mut block = if self.carry.is_empty() {
            chunk
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(&chunk);
            joined
        };
        let whole = block.len() - block.len() % FRAME_BYTES;
        self.carry = block.split_off(whole);
        block
    }

    /// Whatever is left at end of stream: at most one partial frame.
    pub fn finish(self) -> Vec<u8> {
        self.carry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str, u8);

    impl Stage for Tag {
        fn name(&self) -> &'static str {
            self.0
        }
        fn process(&mut self, block: &mut [u8]) {
            for b in block.iter_mut() {
                *b = b.wrapping_mul(10).wrapping_add(self.1);
            }
        }
    }

    #[test]
    fn chain_runs_in_push_order() {
        let mut chain = Chain::new();
        chain.push(Box::new(Tag("a", 1)));
        chain.push(Box::new(Tag("b", 2)));
        let mut block = [0u8; 4];
        chain.process(&mut block);
        assert_eq!(block, [12; 4]);
        assert_eq!(chain.names(), vec!["a", "b"]);
    }

    #[test]
    fn aligner_carries_partial_frames() {
        let mut aligner = FrameAligner::new();
        assert_eq!(aligner.align(vec![1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 4]);
        assert_eq!(aligner.align(vec![7]), Vec::<u8>::new());
        assert_eq!(aligner.align(vec![8, 9, 10]), vec![5, 6, 7, 8]);
        assert_eq!(aligner.finish(), vec![9, 10]);
    }

    #[test]
    fn aligned_chunks_pass_straight_through() {
        let mut aligner = FrameAligner::new();
        let chunk: Vec<u8> = (0..16).collect();
        assert_eq!(aligner.align(chunk.clone()), chunk);
        assert!(aligner.finish().is_empty());
    }
}
