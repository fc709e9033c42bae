use crate::GlobalStep;
use crossbeam_channel::Sender;
use log::trace;
use meta_a3c_core::record::{Record, RecordValue, GLOBAL_STEP_KEY};
use std::sync::Arc;

/// A record sent from a worker to the [`AsyncTrainer`](crate::AsyncTrainer).
pub struct RecordMessage {
    /// ID of the worker.
    pub worker_id: usize,

    /// The record, with the global step at the time it was sent.
    pub record: Record,
}

/// Sends records of a worker to the [`AsyncTrainer`](crate::AsyncTrainer).
#[derive(Clone)]
pub struct RecordEmitter {
    worker_id: usize,
    sender: Option<Sender<RecordMessage>>,
    global_step: Arc<GlobalStep>,
}

impl RecordEmitter {
    /// Creates an emitter. Records are discarded if `sender` is `None`.
    pub fn new(
        worker_id: usize,
        sender: Option<Sender<RecordMessage>>,
        global_step: Arc<GlobalStep>,
    ) -> Self {
        Self {
            worker_id,
            sender,
            global_step,
        }
    }

    /// ID of the worker.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Returns `true` for the worker reporting training summaries.
    pub fn is_chief(&self) -> bool {
        self.worker_id == 0
    }

    /// Sends a record tagged with the current global step.
    pub fn emit(&self, mut record: Record) {
        if let Some(sender) = &self.sender {
            let step = self.global_step.get();
            record.insert(GLOBAL_STEP_KEY, RecordValue::Step(step));
            let msg = RecordMessage {
                worker_id: self.worker_id,
                record,
            };
            if sender.send(msg).is_err() {
                trace!("Worker {}: receiver of records was dropped", self.worker_id);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_emitted_records_carry_exact_global_step() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let global_step = Arc::new(GlobalStep::new());
        global_step.add((1 << 24) + 1);
        let emitter = RecordEmitter::new(3, Some(sender), global_step);

        emitter.emit(Record::from_scalar("model/entropy", 1.0));
        let msg = receiver.try_recv().unwrap();
        assert_eq!(msg.worker_id, 3);
        assert_eq!(msg.record.get_step(GLOBAL_STEP_KEY).unwrap(), 16_777_217);
    }
}
