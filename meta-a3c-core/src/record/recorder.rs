use super::Record;

/// Writes records to an output destination, e.g. TensorBoard.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record);
}
