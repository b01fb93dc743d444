use std::{
    fmt,
    panic::Location,
    sync::{Arc, Mutex, PoisonError},
};

/// A single soft failure recorded during a test run.
#[derive(Debug, Clone)]
pub struct Failure {
    scope: Arc<str>,
    message: String,
    location: &'static Location<'static>,
}

impl Failure {
    /// The test case / event the failure was reported under, e.g. `install/create-widget`.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the failing expectation was declared, or where it was reported from.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}:{})",
            self.scope,
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// Soft-fail test reporter.
///
/// Failures are recorded and logged but never abort execution, so a single
/// run surfaces every violated expectation. Clones share the same failure
/// list; [`scoped`](Reporter::scoped) derives a reporter for a nested scope.
///
/// # Example
///
/// ```rust
/// use ctrlcheck::Reporter;
///
/// let case = Reporter::new("install");
/// let event = case.scoped("create-widget");
/// event.error("widget was never created");
///
/// assert!(case.has_failed());
/// assert_eq!(case.failures()[0].scope(), "install/create-widget");
/// ```
#[derive(Debug, Clone)]
pub struct Reporter {
    scope: Arc<str>,
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl Reporter {
    pub fn new(scope: impl Into<Arc<str>>) -> Self {
        Self {
            scope: scope.into(),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A reporter for `self`'s scope extended with `name`, sharing the failure list.
    pub fn scoped(&self, name: &str) -> Self {
        Self {
            scope: format!("{}/{}", self.scope, name).into(),
            failures: self.failures.clone(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Record a failure located at the caller.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.error_at(message, Location::caller());
    }

    /// Record a failure located at `location`, typically the declaration
    /// site of a verifier or assertion.
    pub fn error_at(&self, message: impl Into<String>, location: &'static Location<'static>) {
        let failure = Failure {
            scope: self.scope.clone(),
            message: message.into(),
            location,
        };
        tracing::error!(
            scope = %failure.scope,
            location = %failure.location,
            "{}",
            failure.message
        );
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    /// Returns true if any failure was recorded through this reporter or any
    /// reporter sharing its failure list.
    pub fn has_failed(&self) -> bool {
        !self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Freeze the recorded failures into a [`Report`].
    pub fn report(&self) -> Report {
        Report {
            name: self.scope.clone(),
            failures: self.failures(),
        }
    }
}

/// Outcome of a test case run.
#[derive(Debug, Clone)]
pub struct Report {
    name: Arc<str>,
    failures: Vec<Failure>,
}

impl Report {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Panics listing every recorded failure, if there are any.
    #[track_caller]
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!("{self}");
        }
    }

    /// Serialize the report as a JSON document.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(serde::Serialize)]
        struct FailureRecord<'a> {
            scope: &'a str,
            message: &'a str,
            file: &'a str,
            line: u32,
        }

        #[derive(serde::Serialize)]
        struct ReportRecord<'a> {
            name: &'a str,
            passed: bool,
            failures: Vec<FailureRecord<'a>>,
        }

        serde_json::to_string(&ReportRecord {
            name: &self.name,
            passed: self.passed(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureRecord {
                    scope: &f.scope,
                    message: &f.message,
                    file: f.location.file(),
                    line: f.location.line(),
                })
                .collect(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "{}: passed", self.name);
        }
        writeln!(f, "{}: {} failure(s)", self.name, self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  - {failure}")?;
        }
        Ok(())
    }
}
