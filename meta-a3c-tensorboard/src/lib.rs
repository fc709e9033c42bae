//! Recorder writing TensorBoard event files.
use log::warn;
use meta_a3c_core::record::{Record, RecordValue, Recorder, GLOBAL_STEP_KEY};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
///
/// The step of the values in a record is taken from the value of the key
/// [`GLOBAL_STEP_KEY`], which workers and the evaluator put in every record.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: GLOBAL_STEP_KEY.to_string(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] warning about values other than scalars.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: GLOBAL_STEP_KEY.to_string(),
            ignore_unsupported_value: false,
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] in the [Record].
    /// Other variants will be ignored.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Step(v)) => *v as usize,
            _ => {
                warn!("Record without {} is discarded", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k != self.step_key {
                match v {
                    RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                    RecordValue::DateTime(_) | RecordValue::Step(_) => {} // discard value
                    _ => {
                        if !self.ignore_unsupported_value {
                            warn!("Unsupported value: {:?}", (k, v));
                        }
                    }
                };
            }
        }
        self.writer.flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_write_creates_event_file() {
        let tmp = TempDir::new("tensorboard").unwrap();
        let mut recorder = TensorboardRecorder::new(tmp.path());
        recorder.write(Record::from_slice(&[
            (GLOBAL_STEP_KEY, RecordValue::Step(100)),
            ("Eval/Average_Reward", RecordValue::Scalar(0.5)),
        ]));
        // Records without the global step are skipped
        recorder.write(Record::from_scalar("model/entropy", 1.0));

        let n_files = std::fs::read_dir(tmp.path()).unwrap().count();
        assert!(n_files > 0);
    }
}
