use crate::shared::frame::Frame;

/// Object form of a per-frame transform.
///
/// `process` reads `input` and fills `output`. The output buffer is reused
/// across frames and starts out empty, so implementations must overwrite it
/// completely. `input` is mutable so a transform may annotate the source
/// frame in place.
pub trait FrameProcessor: Send {
    fn process(&mut self, input: &mut Frame, output: &mut Frame);
}

/// Function form of a per-frame transform; same contract as
/// [`FrameProcessor::process`].
pub type FrameFunction = Box<dyn FnMut(&mut Frame, &mut Frame) + Send>;

/// The installed transform. Exactly one form is active at a time.
pub enum FrameTransform {
    Function(FrameFunction),
    Processor(Box<dyn FrameProcessor>),
}

impl FrameTransform {
    pub fn apply(&mut self, input: &mut Frame, output: &mut Frame) {
        match self {
            FrameTransform::Function(f) => f(input, output),
            FrameTransform::Processor(p) => p.process(input, output),
        }
    }
}

impl std::fmt::Debug for FrameTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameTransform::Function(_) => f.write_str("FrameTransform::Function"),
            FrameTransform::Processor(_) => f.write_str("FrameTransform::Processor"),
        }
    }
}
