use tracing::warn;

/// Configuration for batch processing operations.
///
/// Controls how many blocking jobs run concurrently on the worker pool.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// The number of items to process concurrently in each batch.
    ///
    /// Higher values increase parallelism but keep more input streams and
    /// temporary files open at once.
    pub concurrent_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_batch_size: 10,
        }
    }
}

impl BatchConfig {
    pub fn new(concurrent_batch_size: usize) -> Self {
        Self {
            concurrent_batch_size: concurrent_batch_size.max(1),
        }
    }
}

/// Result of processing a single item in a batch.
#[derive(Debug)]
pub struct BatchItemResult<R> {
    /// Position of the item in the input
    pub position: usize,
    pub result: R,
}

/// Processor for CPU-bound jobs fanned out over the blocking worker pool.
///
/// Items are processed in chunks of `concurrent_batch_size`; results come
/// back in input order.
///
/// # Examples
///
/// ```rust,ignore
/// let results = BatchProcessor::process_blocking(
///     entries,
///     &BatchConfig::default(),
///     |entry| compress(entry),
/// ).await;
/// ```
pub struct BatchProcessor;

impl BatchProcessor {
    /// Process items in concurrent batches
    pub async fn process_blocking<F, T, R>(
        items: Vec<T>,
        config: &BatchConfig,
        processor: F,
    ) -> Vec<BatchItemResult<R>>
    where
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
        T: Send + 'static,
        R: Send + 'static,
    {
        let mut results = Vec::with_capacity(items.len());
        let batch_size = config.concurrent_batch_size.max(1);

        let mut items = items.into_iter().enumerate().peekable();
        while items.peek().is_some() {
            let chunk: Vec<(usize, T)> = items.by_ref().take(batch_size).collect();
            results.extend(Self::process_chunk(chunk, processor.clone()).await);
        }

        results
    }

    /// Process a single chunk concurrently
    async fn process_chunk<F, T, R>(chunk: Vec<(usize, T)>, processor: F) -> Vec<BatchItemResult<R>>
    where
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
        T: Send + 'static,
        R: Send + 'static,
    {
        let mut handles = Vec::with_capacity(chunk.len());

        for (position, item) in chunk {
            let processor = processor.clone();
            let handle = tokio::task::spawn_blocking(move || BatchItemResult {
                position,
                result: processor(item),
            });
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    // A panicked job leaves a gap; callers detect it by position
                    warn!("Batch processing task panicked: {}", e);
                }
            }
        }

        results
    }
}
