pub const FLAGS_OFFSET: usize = 1;
pub const TIMESTAMP_RANGE: std::ops::Range<usize> = 2..6;
pub const HEART_RATE_OFFSET: usize = 6;
pub const BREATH_RATE_OFFSET: usize = 7;
pub const TEMPERATURE_RANGE: std::ops::Range<usize> = 8..10;
pub const HUMIDITY_OFFSET: usize = 10;
pub const POWER_OFFSET: usize = 11;
pub const GYRO_X_OFFSET: usize = 12;
pub const GYRO_Y_OFFSET: usize = 13;
pub const GYRO_Z_OFFSET: usize = 14;
pub const STEP_DELTA_OFFSET: usize = 15;
pub const SAMPLES_OFFSET: usize = 16;

pub const HEADER_LEN: usize = SAMPLES_OFFSET;

pub const WEARING_MASK: u8 = 0x01;
pub const POSE_SHIFT: u8 = 4;
pub const POSE_MASK: u8 = 0x0F;

/// Temperature is carried in hundredths of a degree.
pub const TEMPERATURE_SCALE: f64 = 100.0;

pub const HISTORY_LEN: usize = 64;
pub const RAW_BUFFER_LEN: usize = 256;
/// Smoothing factor for the filtered HR/BR buffers.
pub const FILTER_ALPHA: f64 = 0.25;
