//! Constants used throughout the application

/// Number of cells in the 4x4 thermal array
pub const SENSOR_CELLS: usize = 16;

/// Number of directional columns in a hit histogram
pub const HISTOGRAM_COLUMNS: usize = 4;

/// Cells per column
pub const CELLS_PER_COLUMN: usize = SENSOR_CELLS / HISTOGRAM_COLUMNS;

/// Histogram weight of a cell above the burn threshold
pub const BURN_HIT_WEIGHT: u32 = 10;

/// Histogram weight of a cell above the person threshold
pub const PERSON_HIT_WEIGHT: u32 = 1;

/// Default person detection threshold (degrees Fahrenheit)
pub const DEFAULT_PERSON_TEMP_THRESHOLD: f64 = 79.0;

/// Default burn hazard threshold (degrees Fahrenheit)
pub const DEFAULT_BURN_HAZARD_TEMP: f64 = 100.0;

/// Servo pulse width limits and center (microseconds)
pub const DEFAULT_SERVO_LOW_US: i32 = 600;
pub const DEFAULT_SERVO_HIGH_US: i32 = 2300;
pub const DEFAULT_SERVO_CENTER_US: i32 = 1500;

/// Smallest pulse width step the servo driver accepts (microseconds)
pub const MINIMUM_SERVO_GRANULARITY: i32 = 10;

/// PID outputs at or below this magnitude do not move the head (microseconds)
pub const MINIMUM_ERROR_GRANULARITY: f64 = 20.0;

/// Default PID gains
pub const DEFAULT_PID_KP: f64 = 1.0;
pub const DEFAULT_PID_KI: f64 = 0.1;
pub const DEFAULT_PID_KD: f64 = 0.0;

/// Integrator windup bounds
pub const DEFAULT_PID_INTEGRATOR_MAX: f64 = 500.0;
pub const DEFAULT_PID_INTEGRATOR_MIN: f64 = -500.0;

/// Head offsets applied by the position estimators (microseconds)
pub const FAR_ONE: i32 = 240;
pub const NEAR_ONE: i32 = 100;
pub const FAR_TWO: i32 = 170;
pub const NEAR_THREE: i32 = 30;

/// One-hit cycles tolerated before the head follows a single hit
pub const POSSIBLE_PERSON_MAX: u32 = 10;

/// Hits needed before a signal counts as a person
pub const PERSON_HIT_COUNT: u32 = 4;

/// Confirmed two-hit cycles before greeting a person
pub const PROBABLE_PERSON_THRESH: u32 = 3;

/// Roam steps between re-centering
pub const ROAM_MAX: u32 = 600;

/// Sweep step while roaming (microseconds)
pub const ROAMING_GRANULARITY: i32 = 50;

/// Seconds between sensor measurements
pub const MEASUREMENT_WAIT_PERIOD: f64 = 0.3;

/// Multiple of the measurement period to wait after a head move
pub const SETTLE_FACTOR: f64 = 1.0;
