// BufferPool - lock-free buffer pool with dual SPSC queues
//
// Implements an object pool pattern using two lock-free SPSC (Single Producer Single Consumer)
// ring buffers carrying raw PCM batches to the processing thread. All buffers are allocated up
// front, so neither the capture callback nor the processing loop touches the heap.
//
// Architecture:
// - DATA_QUEUE: capture side pushes filled buffers, processing thread consumes
// - POOL_QUEUE: processing thread returns drained buffers, capture side recycles
//
// Buffer flow:
// 1. Capture side pops an empty buffer from POOL_QUEUE
// 2. Capture side copies one batch into it (len = batch length, capacity untouched)
// 3. Capture side pushes the filled buffer to DATA_QUEUE
// 4. Processing thread pops the buffer from DATA_QUEUE and runs the pipeline on it
// 5. Processing thread pushes the buffer back to POOL_QUEUE

use rtrb::{Consumer, Producer};

/// Audio buffer type - pre-allocated vector of f32 samples
pub type AudioBuffer = Vec<f32>;

/// All four queue ends, before they are split between threads
pub struct BufferPoolChannels {
    /// Producer for sending filled audio buffers to the processing thread
    pub data_producer: Producer<AudioBuffer>,
    /// Consumer for receiving filled audio buffers in the processing thread
    pub data_consumer: Consumer<AudioBuffer>,
    /// Producer for returning drained buffers from the processing thread
    pub pool_producer: Producer<AudioBuffer>,
    /// Consumer for retrieving empty buffers on the capture side
    pub pool_consumer: Consumer<AudioBuffer>,
    buffer_size: usize,
    buffer_count: usize,
}

impl BufferPoolChannels {
    /// Split into the capture-side and processing-side halves
    pub fn split_for_threads(self) -> (SampleSender, SampleReceiver) {
        (
            SampleSender {
                data_producer: self.data_producer,
                pool_consumer: self.pool_consumer,
                buffer_size: self.buffer_size,
                buffer_count: self.buffer_count,
            },
            SampleReceiver {
                data_consumer: self.data_consumer,
                pool_producer: self.pool_producer,
            },
        )
    }
}

/// Lock-free buffer pool using dual SPSC ring buffers
///
/// # Thread Safety
/// - Lock-free: No mutex locks in queue operations
/// - Wait-free: Push/pop operations have bounded execution time
pub struct BufferPool;

impl BufferPool {
    /// Create a new BufferPool with specified buffer count and size
    ///
    /// # Arguments
    /// * `buffer_count` - Number of buffers to pre-allocate (typical: 8-32)
    /// * `buffer_size` - Capacity of each buffer in f32 samples (one audio quantum)
    ///
    /// # Panics
    /// Panics if buffer_count is 0 or buffer_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, buffer_size: usize) -> BufferPoolChannels {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(buffer_size > 0, "buffer_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        // The pool queue has exactly buffer_count slots, so these pushes cannot fail
        for _ in 0..buffer_count {
            let _ = pool_producer.push(Vec::with_capacity(buffer_size));
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
            buffer_size,
            buffer_count,
        }
    }
}

/// Capture-side half: copies batches into pooled buffers
pub struct SampleSender {
    data_producer: Producer<AudioBuffer>,
    pool_consumer: Consumer<AudioBuffer>,
    buffer_size: usize,
    buffer_count: usize,
}

impl SampleSender {
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Queue `samples`, split into chunks of at most `buffer_size`
    ///
    /// # Returns
    /// * `Ok(())` - Every sample was queued
    /// * `Err(dropped)` - The pool ran dry; the trailing `dropped` samples were discarded
    pub fn send(&mut self, samples: &[f32]) -> Result<(), usize> {
        for (index, chunk) in samples.chunks(self.buffer_size).enumerate() {
            let mut buffer = match self.pool_consumer.pop() {
                Ok(buffer) => buffer,
                Err(_) => return Err(samples.len() - index * self.buffer_size),
            };
            buffer.clear();
            buffer.extend_from_slice(chunk);

            // Buffers only leave the pool through here, so the data queue always has room
            if self.data_producer.push(buffer).is_err() {
                return Err(samples.len() - index * self.buffer_size);
            }
        }
        Ok(())
    }

    /// Share of pooled buffers currently queued or being processed
    pub fn occupancy_percent(&self) -> f32 {
        let free = self.pool_consumer.slots();
        (self.buffer_count - free.min(self.buffer_count)) as f32 * 100.0 / self.buffer_count as f32
    }
}

/// Processing-side half: pops filled buffers and returns them to the pool
pub struct SampleReceiver {
    data_consumer: Consumer<AudioBuffer>,
    pool_producer: Producer<AudioBuffer>,
}

impl SampleReceiver {
    pub fn recv(&mut self) -> Option<AudioBuffer> {
        self.data_consumer.pop().ok()
    }

    pub fn recycle(&mut self, buffer: AudioBuffer) {
        // Every buffer came from the pool, so there is always a free slot
        let _ = self.pool_producer.push(buffer);
    }

    /// The sender was dropped and every queued buffer has been drained
    pub fn is_closed(&self) -> bool {
        self.data_consumer.is_abandoned() && self.data_consumer.is_empty()
    }
}
