#[cfg(test)]
pub mod fixtures {
    use serde_yaml::{Mapping, Value};
    use std::cell::RefCell;
    use std::thread;
    use std::time::Duration;

    use crate::k8s::{CheckRepository, CheckResource, K8sError};
    use crate::probe::{CheckResult, Labels, Probe, ProbeArgs, ProbeKind, RegistryError, labels};

    /// Probe returning a fixed result, optionally after a delay or by panicking.
    #[derive(Debug, Clone)]
    pub struct StaticProbe {
        result: CheckResult,
        labels: Labels,
        delay: Duration,
        panics: bool,
    }

    impl StaticProbe {
        pub fn new(result: CheckResult) -> Self {
            Self {
                result,
                labels: Labels::new(),
                delay: Duration::ZERO,
                panics: false,
            }
        }

        pub fn ok(message: &str) -> Self {
            Self::new(CheckResult::ok(message))
        }

        pub fn warn(message: &str) -> Self {
            Self::new(CheckResult::warn(message))
        }

        pub fn err(message: &str) -> Self {
            Self::new(CheckResult::err(message))
        }

        pub fn panicking() -> Self {
            Self {
                panics: true,
                ..Self::ok("unreachable")
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn with_label(mut self, key: &str, value: &str) -> Self {
            self.labels.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl Probe for StaticProbe {
        fn invoke(&self) -> CheckResult {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            if self.panics {
                panic!("static probe asked to panic");
            }
            self.result.clone()
        }

        fn labels(&self) -> Labels {
            self.labels.clone()
        }
    }

    fn build_static(args: ProbeArgs) -> Result<Box<dyn Probe>, RegistryError> {
        let message = args.str("message")?.unwrap_or_else(|| "static".to_string());
        let result = match args.str("status")?.as_deref() {
            None | Some("ok") => CheckResult::ok(message),
            Some("warn") => CheckResult::warn(message),
            Some("err") => CheckResult::err(message),
            Some(other) => return Err(args.invalid("status", format!("unknown status '{}'", other))),
        };
        let mut probe = StaticProbe::new(result);
        probe.labels = labels(
            ["name", "host"]
                .into_iter()
                .filter_map(|key| args.str(key).ok().flatten().map(|value| (key, value))),
        );
        Ok(Box::new(probe))
    }

    fn parse_static(literal: &str) -> Result<Mapping, String> {
        let mut args = Mapping::new();
        args.insert(Value::from("name"), Value::from(literal));
        Ok(args)
    }

    /// A probe kind named `static` whose labels mirror its `name` and `host`
    /// arguments.
    pub fn static_kind() -> ProbeKind {
        ProbeKind {
            name: "static",
            help: "Fixed result for tests",
            parameters: &["name", "host", "status", "message"],
            constructor: build_static,
            parse_target: parse_static,
        }
    }

    /// In-memory [`CheckRepository`].
    pub struct FakeRepository {
        resources: Option<Vec<CheckResource>>,
        last_query: RefCell<Option<(String, Option<String>)>>,
    }

    impl FakeRepository {
        pub fn with(resources: Vec<CheckResource>) -> Self {
            Self {
                resources: Some(resources),
                last_query: RefCell::new(None),
            }
        }

        /// Repository whose listing fails as if the CRD were not installed.
        pub fn crd_missing() -> Self {
            Self {
                resources: None,
                last_query: RefCell::new(None),
            }
        }

        pub fn last_query(&self) -> Option<(String, Option<String>)> {
            self.last_query.borrow().clone()
        }
    }

    impl CheckRepository for FakeRepository {
        fn list_checks(
            &self,
            namespace: &str,
            selector: Option<&str>,
        ) -> Result<Vec<CheckResource>, K8sError> {
            *self.last_query.borrow_mut() =
                Some((namespace.to_string(), selector.map(str::to_string)));
            self.resources
                .clone()
                .ok_or_else(|| K8sError::CrdNotInstalled {
                    namespace: namespace.to_string(),
                })
        }
    }
}
