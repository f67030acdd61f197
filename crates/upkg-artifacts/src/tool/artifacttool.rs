use std::ffi::OsStr;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::event::{Level, LogEvent};
use super::invoker::{ExternalToolInvoker, Invocation};
use super::ToolError;
use crate::credential::{Credential, CredentialSource};
use crate::org::Organization;

/// Child environment variable the tool reads the PAT from. Only the name
/// is passed on the command line.
pub const PAT_ENV_KEY: &str = "AZURE_DEVOPS_EXT_ARTIFACTTOOL_PATVAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub feed: String,
    pub name: String,
    pub version: String,
    /// Directory holding the package contents.
    pub path: PathBuf,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub feed: String,
    pub name: String,
    pub version: String,
    /// Directory the package contents are written to.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPackage {
    pub organization: Organization,
    pub feed: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whatever the tool printed on stdout, when it was JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadedPackage {
    pub organization: Organization,
    pub feed: String,
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub trait ArtifactTool {
    fn publish(
        &self,
        organization: &Organization,
        request: &PublishRequest,
    ) -> Result<PublishedPackage, ToolError>;

    fn download(
        &self,
        organization: &Organization,
        request: &DownloadRequest,
    ) -> Result<DownloadedPackage, ToolError>;
}

/// Hands out a runnable tool executable, installing it first if needed.
pub trait ToolProvider {
    fn executable(
        &self,
        organization: &Organization,
        credential: &Credential,
    ) -> Result<PathBuf, ToolError>;
}

/// Turns typed requests into `ArtifactTool universal ...` runs.
pub struct ArtifactToolInvoker<I, P, C> {
    invoker: I,
    provider: P,
    credentials: C,
}

impl<I, P, C> ArtifactToolInvoker<I, P, C>
where
    I: ExternalToolInvoker,
    P: ToolProvider,
    C: CredentialSource,
{
    pub fn new(invoker: I, provider: P, credentials: C) -> Self {
        Self {
            invoker,
            provider,
            credentials,
        }
    }

    fn invocation(
        &self,
        organization: &Organization,
        verb: &str,
        common: [(&str, &OsStr); 4],
    ) -> Result<Invocation, ToolError> {
        let credential = self.credentials.credential(organization)?;
        let program = self.provider.executable(organization, &credential)?;

        let mut invocation = Invocation::new(&program)
            .arg("universal")
            .arg(verb)
            .arg("--service")
            .arg(organization.as_str())
            .arg("--patvar")
            .arg(PAT_ENV_KEY)
            .env(PAT_ENV_KEY, credential.token());
        for (flag, value) in common {
            invocation = invocation.arg(flag).arg(value);
        }
        Ok(invocation)
    }

    fn run(&self, invocation: &Invocation) -> Result<Option<Value>, ToolError> {
        let mut last_error: Option<String> = None;
        let mut on_line = |line: &str| {
            if line.trim().is_empty() {
                return None;
            }
            match LogEvent::parse(line) {
                Some(event) => {
                    event.emit();
                    if event.level() == Level::Error {
                        last_error = Some(event.text());
                    }
                    event.progress()
                }
                None => {
                    warn!(target: "artifacttool", "{line}");
                    None
                }
            }
        };

        let stdout = match self.invoker.run(invocation, &mut on_line) {
            Ok(stdout) => stdout,
            Err(ToolError::Exit {
                program,
                code,
                message,
            }) => {
                return Err(ToolError::Exit {
                    program,
                    code,
                    message: last_error.unwrap_or(message),
                });
            }
            Err(e) => return Err(e),
        };

        Ok(details(&stdout))
    }
}

fn details(stdout: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(stdout);
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("artifact tool output is not JSON: {e}");
            debug!(output = %text, "artifact tool stdout");
            None
        }
    }
}

impl<I, P, C> ArtifactTool for ArtifactToolInvoker<I, P, C>
where
    I: ExternalToolInvoker,
    P: ToolProvider,
    C: CredentialSource,
{
    fn publish(
        &self,
        organization: &Organization,
        request: &PublishRequest,
    ) -> Result<PublishedPackage, ToolError> {
        let mut invocation = self
            .invocation(
                organization,
                "publish",
                [
                    ("--feed", OsStr::new(&request.feed)),
                    ("--package-name", OsStr::new(&request.name)),
                    ("--package-version", OsStr::new(&request.version)),
                    ("--path", request.path.as_os_str()),
                ],
            )?
            .with_message("Publishing");
        if let Some(description) = &request.description {
            invocation = invocation.arg("--description").arg(description.as_str());
        }

        let details = self.run(&invocation)?;
        Ok(PublishedPackage {
            organization: organization.clone(),
            feed: request.feed.clone(),
            name: request.name.clone(),
            version: request.version.clone(),
            description: request.description.clone(),
            details,
        })
    }

    fn download(
        &self,
        organization: &Organization,
        request: &DownloadRequest,
    ) -> Result<DownloadedPackage, ToolError> {
        let invocation = self
            .invocation(
                organization,
                "download",
                [
                    ("--feed", OsStr::new(&request.feed)),
                    ("--package-name", OsStr::new(&request.name)),
                    ("--package-version", OsStr::new(&request.version)),
                    ("--path", request.path.as_os_str()),
                ],
            )?
            .with_message("Downloading");

        let details = self.run(&invocation)?;
        Ok(DownloadedPackage {
            organization: organization.clone(),
            feed: request.feed.clone(),
            name: request.name.clone(),
            version: request.version.clone(),
            path: request.path.clone(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialError;
    use std::cell::RefCell;
    use std::path::Path;
    use upkg_core::ui::tracker::Status;

    struct Recorder {
        seen: RefCell<Vec<Invocation>>,
        lines: Vec<&'static str>,
        statuses: RefCell<Vec<Status>>,
        result: fn() -> Result<Vec<u8>, ToolError>,
    }

    impl Recorder {
        fn new(result: fn() -> Result<Vec<u8>, ToolError>) -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                lines: Vec::new(),
                statuses: RefCell::new(Vec::new()),
                result,
            }
        }
    }

    impl ExternalToolInvoker for &Recorder {
        fn run(
            &self,
            invocation: &Invocation,
            on_line: &mut dyn FnMut(&str) -> Option<Status>,
        ) -> Result<Vec<u8>, ToolError> {
            self.seen.borrow_mut().push(invocation.clone());
            for line in &self.lines {
                if let Some(status) = on_line(line) {
                    self.statuses.borrow_mut().push(status);
                }
            }
            (self.result)()
        }
    }

    struct FixedTool;

    impl ToolProvider for FixedTool {
        fn executable(&self, _: &Organization, _: &Credential) -> Result<PathBuf, ToolError> {
            Ok(PathBuf::from("/tools/ArtifactTool"))
        }
    }

    struct NoCredentials;

    impl CredentialSource for NoCredentials {
        fn credential(&self, organization: &Organization) -> Result<Credential, CredentialError> {
            Err(CredentialError::Missing {
                organization: organization.to_string(),
            })
        }
    }

    fn org() -> Organization {
        Organization::parse("https://dev.azure.com/org").unwrap()
    }

    fn publish_request(description: Option<&str>) -> PublishRequest {
        PublishRequest {
            feed: "myfeed".to_string(),
            name: "pkg".to_string(),
            version: "1.0.0".to_string(),
            path: PathBuf::from("/tmp/pkg"),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn publish_arguments() {
        let recorder = Recorder::new(|| Ok(br#"{"id":"abc"}"#.to_vec()));
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("secret-pat"));

        let published = tool.publish(&org(), &publish_request(None)).unwrap();

        let seen = recorder.seen.borrow();
        let inv = &seen[0];
        assert_eq!(inv.program, Path::new("/tools/ArtifactTool"));
        assert_eq!(
            inv.args,
            [
                "universal",
                "publish",
                "--service",
                "https://dev.azure.com/org",
                "--patvar",
                PAT_ENV_KEY,
                "--feed",
                "myfeed",
                "--package-name",
                "pkg",
                "--package-version",
                "1.0.0",
                "--path",
                "/tmp/pkg",
            ]
        );
        assert_eq!(inv.initial_message, "Publishing");
        assert_eq!(
            inv.env,
            [(PAT_ENV_KEY.to_string(), "secret-pat".to_string())]
        );
        assert!(
            !inv.args
                .iter()
                .any(|a| a.to_string_lossy().contains("secret-pat"))
        );

        assert_eq!(published.feed, "myfeed");
        assert_eq!(published.details, Some(serde_json::json!({"id": "abc"})));
    }

    #[test]
    fn description_only_when_present() {
        let recorder = Recorder::new(|| Ok(Vec::new()));
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("pat"));

        tool.publish(&org(), &publish_request(Some("my package")))
            .unwrap();
        let seen = recorder.seen.borrow();
        assert_eq!(
            &seen[0].args[seen[0].args.len() - 2..],
            ["--description", "my package"]
        );
    }

    #[test]
    fn download_arguments() {
        let recorder = Recorder::new(|| Ok(b"not json".to_vec()));
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("pat"));
        let request = DownloadRequest {
            feed: "myfeed".to_string(),
            name: "pkg".to_string(),
            version: "2.0.0".to_string(),
            path: PathBuf::from("/tmp/out"),
        };

        let downloaded = tool.download(&org(), &request).unwrap();
        assert_eq!(downloaded.path, PathBuf::from("/tmp/out"));
        assert_eq!(downloaded.details, None);

        let seen = recorder.seen.borrow();
        assert_eq!(seen[0].args[1], "download");
        assert_eq!(seen[0].initial_message, "Downloading");
        assert!(!seen[0].args.iter().any(|a| a == "--description"));
        assert_eq!(&seen[0].args[seen[0].args.len() - 2..], ["--path", "/tmp/out"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_passed_verbatim() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"/tmp/pkg-\xff".to_vec());
        let recorder = Recorder::new(|| Ok(Vec::new()));
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("pat"));
        let request = DownloadRequest {
            feed: "myfeed".to_string(),
            name: "pkg".to_string(),
            version: "2.0.0".to_string(),
            path: PathBuf::from(raw.clone()),
        };

        tool.download(&org(), &request).unwrap();
        let seen = recorder.seen.borrow();
        assert_eq!(seen[0].args.last(), Some(&raw));
    }

    #[test]
    fn exit_message_from_last_error_event() {
        let mut recorder = Recorder::new(|| {
            Err(ToolError::Exit {
                program: "ArtifactTool".to_string(),
                code: Some(1),
                message: "raw".to_string(),
            })
        });
        recorder.lines = vec![
            r#"{"@m":"Starting"}"#,
            r#"{"@m":"Feed myfeed not found","@l":"Error"}"#,
            "trailing noise",
        ];
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("pat"));

        match tool.publish(&org(), &publish_request(None)).unwrap_err() {
            ToolError::Exit { code, message, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "Feed myfeed not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn progress_events_reach_the_invoker() {
        let mut recorder = Recorder::new(|| Ok(Vec::new()));
        recorder.lines = vec![
            r#"{"@m":"Uploading","EventId":{"Name":"Uploading"},"UploadedBytes":50,"TotalBytes":100}"#,
            r#"{"@m":"Done"}"#,
        ];
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, Credential::new("pat"));
        tool.publish(&org(), &publish_request(None)).unwrap();

        let statuses = recorder.statuses.borrow();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].percent, Some(50.0));
    }

    #[test]
    fn missing_credentials_stop_before_running() {
        let recorder = Recorder::new(|| Ok(Vec::new()));
        let tool = ArtifactToolInvoker::new(&recorder, FixedTool, NoCredentials);
        let err = tool.publish(&org(), &publish_request(None)).unwrap_err();
        assert!(matches!(err, ToolError::Credential(_)));
        assert!(recorder.seen.borrow().is_empty());
    }
}
