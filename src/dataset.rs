use std::cmp::Ordering;
use std::collections::HashSet;

use log::{info, warn};
use ndarray::Array1;

use crate::config::Config;
use crate::math::{interpolate, Real};
use crate::{Error, Result};

/// One sensor's measurements, sorted by ascending distance
#[derive(Clone, Debug, PartialEq)]
pub struct SensorSample<E> {
    name: String,
    distances: Array1<E>,
    readings: Array1<E>,
}

impl<E: Real> SensorSample<E> {
    /// Build a sample from `(distance, reading)` pairs in any order
    ///
    /// Readings are expected to fall as distance grows. Samples where they do not are accepted,
    /// the number of rising steps is logged as a warning.
    ///
    /// # Errors
    /// Returns [`Error::EmptySample`] if `pairs` is empty.
    pub fn new(name: impl Into<String>, mut pairs: Vec<(E, E)>) -> Result<Self> {
        let name = name.into();
        if pairs.is_empty() {
            return Err(Error::EmptySample(name));
        }

        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let rising_steps = pairs
            .windows(2)
            .filter(|window| window[1].1 > window[0].1)
            .count();
        if rising_steps > 0 {
            warn!(
                "readings of {name} rise with distance at {rising_steps} of {} steps",
                pairs.len() - 1
            );
        }

        let (distances, readings): (Vec<E>, Vec<E>) = pairs.into_iter().unzip();
        Ok(Self {
            name,
            distances: Array1::from(distances),
            readings: Array1::from(readings),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn distances(&self) -> &Array1<E> {
        &self.distances
    }

    pub const fn readings(&self) -> &Array1<E> {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Always `false`, an empty sample cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// The reading expected at `distance`, linearly interpolated between samples
    ///
    /// Outside the sampled range the reading at the nearest edge is returned. Gives `NaN` for a
    /// `NaN` distance.
    pub fn reading_at(&self, distance: E) -> E {
        self.distances
            .as_slice()
            .zip(self.readings.as_slice())
            .and_then(|(distances, readings)| interpolate(distance, distances, readings))
            .unwrap_or_else(E::nan)
    }

    /// The samples with `lo <= distance <= hi`, or `None` if there are none
    pub fn within(&self, lo: E, hi: E) -> Option<Self> {
        let pairs = self
            .distances
            .iter()
            .zip(&self.readings)
            .filter(|(distance, _)| lo <= **distance && **distance <= hi)
            .map(|(distance, reading)| (*distance, *reading))
            .collect::<Vec<_>>();

        let (distances, readings): (Vec<E>, Vec<E>) = pairs.into_iter().unzip();
        if distances.is_empty() {
            return None;
        }
        Some(Self {
            name: self.name.clone(),
            distances: Array1::from(distances),
            readings: Array1::from(readings),
        })
    }
}

/// Every sensor's sample, in the order the sensors were loaded
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset<E> {
    sensors: Vec<SensorSample<E>>,
}

impl<E: Real> Dataset<E> {
    /// # Errors
    /// Returns [`Error::NoSensors`] for an empty list and [`Error::DuplicateSensor`] if two
    /// samples share a name.
    pub fn new(sensors: Vec<SensorSample<E>>) -> Result<Self> {
        if sensors.is_empty() {
            return Err(Error::NoSensors);
        }
        let mut seen = HashSet::new();
        for sensor in &sensors {
            if !seen.insert(sensor.name()) {
                return Err(Error::DuplicateSensor(sensor.name().to_owned()));
            }
        }
        Ok(Self { sensors })
    }

    /// Look up a sensor's sample by name
    ///
    /// # Errors
    /// Returns [`Error::UnknownSensor`] if no sensor carries `name`.
    pub fn sample(&self, name: &str) -> Result<&SensorSample<E>> {
        self.sensors
            .iter()
            .find(|sensor| sensor.name() == name)
            .ok_or_else(|| Error::UnknownSensor(name.to_owned()))
    }

    pub fn sensors(&self) -> &[SensorSample<E>] {
        &self.sensors
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(SensorSample::name)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

/// Convert a spreadsheet column letter (`A`, `B`, ..., `Z`, `AA`, ...) to a zero-based index
///
/// # Errors
/// Returns [`Error::InvalidColumn`] for anything other than ASCII letters.
///
/// # Examples
///
/// ```
/// use range_calibration::dataset::column_index;
///
/// assert_eq!(column_index("A").unwrap(), 0);
/// assert_eq!(column_index("e").unwrap(), 4);
/// assert_eq!(column_index("AA").unwrap(), 26);
/// assert!(column_index("B2").is_err());
/// ```
pub fn column_index(letter: &str) -> Result<usize> {
    let letter = letter.trim();
    if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidColumn(letter.to_owned()));
    }

    let index = letter
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |acc, byte| {
            acc.checked_mul(26)?
                .checked_add(usize::from(byte - b'A') + 1)
        })
        .ok_or_else(|| Error::InvalidColumn(letter.to_owned()))?;

    Ok(index - 1)
}

/// Inverse of [`column_index`]
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        // `index % 26` is below 26 so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| char::from(b)).collect()
}

/// A header cell can name a sensor if it is neither blank nor a bare number.
fn usable_name(cell: Option<&str>) -> Option<&str> {
    let cell = cell?.trim();
    let numeric = cell
        .chars()
        .filter(|c| !matches!(c, '.' | ','))
        .all(|c| c.is_ascii_digit());
    if cell.is_empty() || numeric {
        None
    } else {
        Some(cell)
    }
}

fn sensor_name(records: &[csv::StringRecord], name_row: usize, column: usize) -> String {
    let cell = |row: usize| records.get(row).and_then(|record| record.get(column));
    usable_name(cell(name_row))
        .or_else(|| usable_name(cell(0)))
        .map_or_else(|| format!("Sensor_{}", column_letter(column)), str::to_owned)
}

fn parse_cell<E: Real>(record: &csv::StringRecord, column: usize) -> Option<E> {
    record
        .get(column)
        .and_then(|cell| cell.trim().parse::<E>().ok())
        .filter(|value| value.is_finite())
}

/// Load every configured sensor from the CSV export of the measurement sheet
///
/// The sheet holds distances in one column and one sensor per further column. Sensor names are
/// read from `name_row`, falling back to the first row and then to `Sensor_<letter>`. Rows from
/// `data_start_row` on are measurements; cells which do not parse as numbers drop the row for that
/// sensor, as do distances outside `[0, max_distance]`.
///
/// # Errors
/// Returns an error if the file cannot be read, a column letter is invalid, an explicitly listed
/// sensor column has no usable rows, or no sensors remain.
pub fn load<E: Real>(config: &Config<E>) -> Result<Dataset<E>> {
    info!("reading measurements from {:?}", config.data);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&config.data)?;
    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let distance_column = column_index(&config.distance_column)?;
    let explicit = config.columns.is_some();
    let columns = match &config.columns {
        Some(letters) => letters
            .iter()
            .map(|letter| column_index(letter))
            .collect::<Result<Vec<_>>>()?,
        None => {
            let width = records.iter().map(csv::StringRecord::len).max().unwrap_or(0);
            (distance_column + 1..width).collect()
        }
    };

    let data = records.get(config.data_start_row..).unwrap_or_default();
    let mut sensors = vec![];
    for column in columns {
        let name = sensor_name(&records, config.name_row, column);
        let pairs = data
            .iter()
            .filter_map(|record| {
                Some((
                    parse_cell::<E>(record, distance_column)?,
                    parse_cell::<E>(record, column)?,
                ))
            })
            .filter(|(distance, _)| *distance >= E::zero() && *distance <= config.max_distance)
            .collect::<Vec<_>>();

        match SensorSample::new(name, pairs) {
            Ok(sample) => {
                log_sample(&sample);
                sensors.push(sample);
            }
            Err(Error::EmptySample(name)) if !explicit => {
                warn!(
                    "skipping column {} ({name}): no usable measurements",
                    column_letter(column)
                );
            }
            Err(e) => return Err(e),
        }
    }

    let dataset = Dataset::new(sensors)?;
    info!("loaded {} sensors", dataset.len());
    Ok(dataset)
}

fn log_sample<E: Real>(sample: &SensorSample<E>) {
    let range = |values: &Array1<E>| {
        values.iter().fold((E::infinity(), E::neg_infinity()), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
    };
    let (distance_min, distance_max) = range(sample.distances());
    let (reading_min, reading_max) = range(sample.readings());
    info!(
        "loaded {} samples for {}: distance {distance_min:.3} - {distance_max:.3} mm, \
         reading {reading_min:.0} - {reading_max:.0}",
        sample.len(),
        sample.name()
    );
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempdir::TempDir;

    use super::{column_index, column_letter, load, Dataset, SensorSample};
    use crate::config::Config;
    use crate::{Error, Result};

    const SHEET: &str = "\
summary,,,
distance,43220065 ROS1,,12220031 ROS2
0.5,1200,900,1100
,1150,880,
0.1,1500,1000,1400
1.0,800,700,750
not a number,1,1,1
2.0,400,abc,380
5.0,10,10,10
";

    fn write_sheet(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("summary.csv");
        std::fs::write(&path, SHEET).unwrap();
        path
    }

    #[test]
    fn samples_are_sorted_by_distance() -> Result<()> {
        let sample = SensorSample::new("s", vec![(3., 250.), (1., 1000.), (2., 500.)])?;
        assert_eq!(sample.distances().to_vec(), vec![1., 2., 3.]);
        assert_eq!(sample.readings().to_vec(), vec![1000., 500., 250.]);
        Ok(())
    }

    #[test]
    fn empty_samples_are_rejected() {
        assert!(matches!(
            SensorSample::<f64>::new("s", vec![]),
            Err(Error::EmptySample(name)) if name == "s"
        ));
    }

    #[test]
    fn rising_samples_are_accepted() -> Result<()> {
        let sample = SensorSample::new("s", vec![(1., 100.), (2., 200.), (3., 300.)])?;
        assert_eq!(sample.len(), 3);
        Ok(())
    }

    #[test]
    fn readings_are_interpolated_and_clamped() -> Result<()> {
        let sample = SensorSample::new("s", vec![(1., 1000.), (2., 500.), (3., 250.)])?;
        approx::assert_relative_eq!(sample.reading_at(1.5), 750.);
        approx::assert_relative_eq!(sample.reading_at(0.5), 1000.);
        approx::assert_relative_eq!(sample.reading_at(3.5), 250.);
        assert!(sample.reading_at(f64::NAN).is_nan());
        Ok(())
    }

    #[test]
    fn window_keeps_inclusive_range() -> Result<()> {
        let sample = SensorSample::new("s", (1..=8).map(|i| (f64::from(i) * 0.5, 1.)).collect())?;
        let windowed = sample.within(1.5, 3.0).unwrap();
        assert_eq!(windowed.distances().to_vec(), vec![1.5, 2.0, 2.5, 3.0]);
        assert!(sample.within(10., 11.).is_none());
        Ok(())
    }

    #[test]
    fn unknown_sensor_is_a_configuration_error() -> Result<()> {
        let dataset = Dataset::new(vec![SensorSample::new("a", vec![(1., 1.)])?])?;
        assert!(dataset.sample("a").is_ok());
        assert!(matches!(
            dataset.sample("b"),
            Err(Error::UnknownSensor(name)) if name == "b"
        ));
        Ok(())
    }

    #[test]
    fn duplicate_sensors_are_rejected() -> Result<()> {
        let sample = SensorSample::new("a", vec![(1., 1.)])?;
        assert!(matches!(
            Dataset::new(vec![sample.clone(), sample]),
            Err(Error::DuplicateSensor(_))
        ));
        assert!(matches!(
            Dataset::<f64>::new(vec![]),
            Err(Error::NoSensors)
        ));
        Ok(())
    }

    #[test]
    fn column_letters_round_trip() {
        for index in [0, 1, 4, 25, 26, 27, 51, 52, 701, 702] {
            assert_eq!(column_index(&column_letter(index)).unwrap(), index);
        }
        assert_eq!(column_letter(27), "AB");
        assert!(column_index("").is_err());
    }

    #[test]
    fn sheet_is_loaded_with_names_and_coercion() -> Result<()> {
        let tmp_dir = TempDir::new("sheet_is_loaded_with_names_and_coercion")?;
        let config: Config<f64> = Config::new(write_sheet(tmp_dir.path()));

        let dataset = load(&config)?;

        let names = dataset.names().collect::<Vec<_>>();
        assert_eq!(names, ["43220065 ROS1", "Sensor_C", "12220031 ROS2"]);

        // The row without a distance, the unparsable rows and the row beyond 4 mm are dropped
        let first = dataset.sample("43220065 ROS1")?;
        assert_eq!(first.distances().to_vec(), vec![0.1, 0.5, 1.0, 2.0]);
        assert_eq!(first.readings().to_vec(), vec![1500., 1200., 800., 400.]);

        let second = dataset.sample("Sensor_C")?;
        assert_eq!(second.distances().to_vec(), vec![0.1, 0.5, 1.0]);
        Ok(())
    }

    #[test]
    fn explicit_columns_are_loaded_in_order() -> Result<()> {
        let tmp_dir = TempDir::new("explicit_columns_are_loaded_in_order")?;
        let mut config: Config<f64> = Config::new(write_sheet(tmp_dir.path()));
        config.columns = Some(vec!["D".to_owned(), "B".to_owned()]);
        config.max_distance = 1.0;

        let dataset = load(&config)?;

        let names = dataset.names().collect::<Vec<_>>();
        assert_eq!(names, ["12220031 ROS2", "43220065 ROS1"]);
        assert_eq!(
            dataset.sample("12220031 ROS2")?.distances().to_vec(),
            vec![0.1, 0.5, 1.0]
        );
        Ok(())
    }

    #[test]
    fn explicit_empty_column_is_an_error() -> Result<()> {
        let tmp_dir = TempDir::new("explicit_empty_column_is_an_error")?;
        let mut config: Config<f64> = Config::new(write_sheet(tmp_dir.path()));
        config.columns = Some(vec!["B".to_owned(), "F".to_owned()]);

        assert!(matches!(load(&config), Err(Error::EmptySample(name)) if name == "Sensor_F"));
        Ok(())
    }
}
