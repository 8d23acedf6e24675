//! In-process scanner invocation (spec §4.3).

use crate::environment::Environment;
use crate::error::ScanResult;
use crate::options::RunOptions;
use crate::scanner::{Payload, Scanner};
use async_trait::async_trait;

/// The cross-language headless browser bridge (spec §1: out of scope,
/// interface only). A scanner that declares [`Scanner::scan_headless`]
/// is routed through this instead of [`Scanner::scan`].
#[async_trait]
pub trait HeadlessBridge: Send + Sync {
    async fn scan(
        &self,
        scanner_name: &str,
        domain: &str,
        env: &Environment,
        opts: &RunOptions,
    ) -> ScanResult<Payload>;
}

/// Default bridge used when no real headless implementation is wired in;
/// errors rather than silently returning an empty payload, since a scanner
/// that asked for headless and got nothing would be a silent data-quality
/// bug.
pub struct NullHeadlessBridge;

#[async_trait]
impl HeadlessBridge for NullHeadlessBridge {
    async fn scan(
        &self,
        scanner_name: &str,
        _domain: &str,
        _env: &Environment,
        _opts: &RunOptions,
    ) -> ScanResult<Payload> {
        Err(crate::error::ScanError::Configuration(format!(
            "scanner '{scanner_name}' requires scan_headless but no HeadlessBridge is configured"
        )))
    }
}

/// Invokes a scanner's probe in the current process.
pub struct LocalExecutor<'a> {
    pub headless: &'a dyn HeadlessBridge,
}

impl<'a> LocalExecutor<'a> {
    pub fn new(headless: &'a dyn HeadlessBridge) -> Self {
        Self { headless }
    }

    pub async fn run(
        &self,
        scanner: &dyn Scanner,
        domain: &str,
        env: &Environment,
        opts: &RunOptions,
    ) -> ScanResult<Payload> {
        let payload = if scanner.scan_headless() {
            self.headless.scan(scanner.name(), domain, env, opts).await?
        } else {
            scanner.scan(domain, env, opts).await?
        };

        normalize(payload)
    }
}

/// Canonicalizes a payload through a JSON round-trip, matching spec §4.3's
/// "serializing to JSON and parsing back, to canonicalize timestamps and
/// numeric forms".
fn normalize(payload: Payload) -> ScanResult<Payload> {
    let bytes = serde_json::to_vec(&payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ScanMethod;
    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    struct EchoScanner;

    #[async_trait]
    impl Scanner for EchoScanner {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn headers(&self) -> Vec<String> {
            vec!["v".to_string()]
        }
        fn to_rows(&self, _payload: &Payload) -> Vec<Vec<String>> {
            vec![]
        }
        async fn scan(
            &self,
            _domain: &str,
            _env: &Environment,
            _opts: &RunOptions,
        ) -> ScanResult<Payload> {
            Ok(json!({"v": 1.0}))
        }
    }

    struct HeadlessScanner;

    #[async_trait]
    impl Scanner for HeadlessScanner {
        fn name(&self) -> &'static str {
            "headless_probe"
        }
        fn headers(&self) -> Vec<String> {
            vec![]
        }
        fn to_rows(&self, _payload: &Payload) -> Vec<Vec<String>> {
            vec![]
        }
        fn scan_headless(&self) -> bool {
            true
        }
    }

    fn env() -> Environment {
        Environment::new(ScanMethod::Local, Uuid::nil(), 1)
    }

    #[tokio::test]
    async fn runs_plain_scan() {
        let bridge = NullHeadlessBridge;
        let executor = LocalExecutor::new(&bridge);
        let payload = executor
            .run(&EchoScanner, "example.com", &env(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(payload, json!({"v": 1.0}));
    }

    #[tokio::test]
    async fn headless_scanner_without_bridge_errors() {
        let bridge = NullHeadlessBridge;
        let executor = LocalExecutor::new(&bridge);
        let err = executor
            .run(&HeadlessScanner, "example.com", &env(), &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ScanError::Configuration(_)));
    }
}
