/// Normalize a vector of audio samples to the range [-1.0, 1.0]
pub fn normalize_samples(samples: &mut [f32]) {
    if samples.is_empty() {
        return;
    }

    let max_abs = samples.iter().fold(0.0f32, |max, &sample| max.max(sample.abs()));

    if max_abs > 0.0 {
        for sample in samples.iter_mut() {
            *sample /= max_abs;
        }
    }
}

/// Average interleaved frames down to a single channel.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Format a time value with appropriate unit suffix (ms, s)
pub fn format_time(time_in_seconds: f32) -> String {
    if time_in_seconds >= 1.0 {
        format!("{:.2} s", time_in_seconds)
    } else {
        format!("{:.0} ms", time_in_seconds * 1000.0)
    }
}

/// Number of whole samples covering `seconds` at `sample_rate`.
pub fn seconds_to_samples(seconds: f32, sample_rate: u32) -> u32 {
    (seconds.max(0.0) * sample_rate as f32).round() as u32
}
