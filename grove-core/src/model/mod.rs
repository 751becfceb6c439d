pub mod sampler;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{ModelError, Result};

/// Evaluates a model with a given payload to a given output
pub trait Evaluator<Payload: ?Sized, Output>: Sync {
    /// Scores one payload
    fn evaluate(&self, payload: &Payload) -> Output;
}

/// Binary serialization for models
pub trait SerDe: Sized {
    /// Writes out a model to writer
    fn save<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Loads a model from a reader.  All necessary metadata should be
    /// stored within the model
    fn load<R: Read>(reader: &mut R) -> Result<Self>;

    /// Writes the model to a new file at `path`
    fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a model from `path`.  The file must hold exactly one model.
    fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let model = Self::load(&mut reader)?;
        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(ModelError::corrupt("trailing bytes after model"));
        }
        Ok(model)
    }
}

/// Optional sink for training instrumentation.  Counters are pushed by name;
/// the default implementation drops them.
pub trait Observer: Send {
    /// Adds `amount` to the counter `key`
    fn record(&mut self, _key: &'static str, _amount: u64) {}

    /// Folds another observer's counters into this one
    fn merge(&mut self, _other: Self)
    where
        Self: Sized,
    {
    }
}

/// The no-op observer
impl Observer for () {}
