//! Output artifact naming.
//!
//! Jars follow the Maven convention `<name>-<version>[-<classifier>].jar`.
//! The shaded jar normally has an empty classifier so it becomes the
//! module's primary artifact; the marker jar carries a classifier such as
//! `empty`.

use jarshade_common::Coordinate;
use std::fmt;

/// The fixed file extension for produced archives.
const JAR_EXTENSION: &str = ".jar";

/// Suffix appended to a jar file name for its build report.
pub const REPORT_SUFFIX: &str = ".shade.json";

/// A deterministic output file name.
///
/// # Examples
///
/// ```
/// use jarshade::naming::ArtifactName;
/// use jarshade_common::Coordinate;
///
/// let coordinate = Coordinate::parse("org.example:cos-bundle:1.0.0").expect("valid");
/// assert_eq!(ArtifactName::new(&coordinate, None).filename(), "cos-bundle-1.0.0.jar");
/// assert_eq!(
///     ArtifactName::new(&coordinate, Some("empty")).filename(),
///     "cos-bundle-1.0.0-empty.jar"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    name: String,
    version: String,
    classifier: Option<String>,
}

impl ArtifactName {
    /// Build a name from a coordinate and optional classifier.
    ///
    /// Blank classifiers are treated as absent.
    #[must_use]
    pub fn new(coordinate: &Coordinate, classifier: Option<&str>) -> Self {
        Self {
            name: coordinate.module().name().to_owned(),
            version: coordinate.version().as_str().to_owned(),
            classifier: classifier
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
        }
    }

    /// Return the classifier, if any.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Return the jar file name.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }

    /// Return the file name of the build report accompanying this jar.
    #[must_use]
    pub fn report_filename(&self) -> String {
        format!("{self}{REPORT_SUFFIX}")
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, "-{classifier}")?;
        }
        f.write_str(JAR_EXTENSION)
    }
}
