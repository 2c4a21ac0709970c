use crate::{Communicator, Result, WorldContext};

/// A world made of the current process only.
#[derive(Debug, Default)]
pub struct SoloWorld;

impl SoloWorld {
    pub fn new() -> Self {
        Self
    }
}

impl Communicator for SoloWorld {
    fn context(&self) -> WorldContext {
        WorldContext::solo()
    }

    fn barrier(&mut self) -> Result<()> {
        Ok(())
    }

    fn gather(&mut self, line: String) -> Result<Option<Vec<String>>> {
        Ok(Some(vec![line]))
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
