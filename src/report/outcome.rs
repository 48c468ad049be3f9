use crate::discovery::WorkItem;
use crate::error::ItemError;

/// Result of processing one work item
///
/// Exactly one outcome is produced per dispatched item, whether or not the
/// conversion succeeded.
#[derive(Debug)]
pub struct Outcome {
    pub item: WorkItem,
    /// Worker that handled the item (`None` if it failed before dispatch)
    pub worker_id: Option<usize>,
    pub success: bool,
    pub bytes_written: u64,
    pub error: Option<ItemError>,
}

impl Outcome {
    pub fn converted(item: WorkItem, worker_id: usize, bytes_written: u64) -> Self {
        Self {
            item,
            worker_id: Some(worker_id),
            success: true,
            bytes_written,
            error: None,
        }
    }

    pub fn failed(item: WorkItem, worker_id: Option<usize>, error: ItemError) -> Self {
        Self {
            item,
            worker_id,
            success: false,
            bytes_written: 0,
            error: Some(error),
        }
    }
}
