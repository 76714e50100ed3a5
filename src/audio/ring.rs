//! Bounded sample queue between the decode thread and the audio callback
//!
//! Single producer (decoder) and single consumer (cpal output callback),
//! backed by a lock-free `ringbuf` heap ring so the real-time callback
//! never blocks. The writer never overwrites unread samples: excess input
//! is refused and the caller retries later. The reader outputs silence on
//! underrun.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a ring holding at most `capacity` interleaved samples.
pub fn sample_ring(capacity: usize) -> (SampleWriter, SampleReader) {
    let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
    (SampleWriter { producer }, SampleReader { consumer })
}

/// Producer half, owned by whoever queues decoded samples.
pub struct SampleWriter {
    producer: HeapProd<f32>,
}

impl SampleWriter {
    /// Queue as many samples as fit and return how many were taken.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Samples queued and not yet read.
    pub fn available(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Consumer half, moved into the output callback.
pub struct SampleReader {
    consumer: HeapCons<f32>,
}

impl SampleReader {
    /// Fill `output`, padding with silence. Returns the number of real samples.
    pub fn read(&mut self, output: &mut [f32]) -> usize {
        let read = self.consumer.pop_slice(output);
        output[read..].fill(0.0);
        read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_write_read() {
        let (mut writer, mut reader) = sample_ring(1024);

        assert_eq!(writer.write(&[1.0, 2.0, 3.0, 4.0]), 4);
        assert_eq!(writer.available(), 4);

        let mut output = [0.0f32; 4];
        assert_eq!(reader.read(&mut output), 4);
        assert_eq!(output, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(writer.available(), 0);
    }

    #[test]
    fn test_underrun_silence() {
        let (mut writer, mut reader) = sample_ring(1024);
        writer.write(&[1.0, 2.0]);

        let mut output = [9.0f32; 4];
        assert_eq!(reader.read(&mut output), 2);
        assert_eq!(output, [1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_full_ring_refuses_excess() {
        let (mut writer, mut reader) = sample_ring(4);

        assert_eq!(writer.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 4);
        assert_eq!(writer.write(&[7.0]), 0);

        // unread samples are kept intact
        let mut output = [0.0f32; 4];
        reader.read(&mut output);
        assert_eq!(output, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_interleaved_writes_keep_order() {
        let (mut writer, mut reader) = sample_ring(8);
        writer.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut out = [0.0f32; 3];
        reader.read(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0]);

        assert_eq!(writer.write(&[6.0, 7.0, 8.0, 9.0]), 4);

        let mut out = [0.0f32; 6];
        assert_eq!(reader.read(&mut out), 6);
        assert_eq!(out, [4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_zero_capacity_holds_one_sample() {
        let (mut writer, _reader) = sample_ring(0);
        assert_eq!(writer.write(&[1.0, 2.0]), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;
        use std::time::Duration;

        let (mut writer, mut reader) = sample_ring(4800);

        let writer = thread::spawn(move || {
            let samples: Vec<f32> = (0..48000).map(|i| (i as f32) / 48000.0).collect();
            let mut total = 0;
            for chunk in samples.chunks(480) {
                total += writer.write(chunk);
                thread::sleep(Duration::from_micros(100));
            }
            total
        });

        let reader = thread::spawn(move || {
            let mut total = 0;
            let mut output = [0.0f32; 480];
            let mut last = -1.0f32;
            for _ in 0..100 {
                let read = reader.read(&mut output);
                // samples come out in the order they were written
                for &sample in &output[..read] {
                    assert!(sample > last);
                    last = sample;
                }
                total += read;
                thread::sleep(Duration::from_micros(200));
            }
            total
        });

        let written = writer.join().unwrap();
        let read = reader.join().unwrap();

        assert!(written > 0);
        assert!(read > 0);
        assert!(read <= written);
    }
}
