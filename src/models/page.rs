//! Classified result of fetching one page.

/// Outcome class of a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    /// Normal content.
    Ok,
    /// Anti-bot interstitial instead of content.
    Challenged,
    /// Transport error, timeout, empty body or non-success status.
    Failed {
        http_status: Option<u16>,
        reason: String,
    },
}

/// Transient fetch result; never persisted.
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    pub status: PageStatus,
    pub body: Option<String>,
}

impl PageFetchResult {
    pub fn ok(body: String) -> Self {
        Self {
            status: PageStatus::Ok,
            body: Some(body),
        }
    }

    pub fn challenged() -> Self {
        Self {
            status: PageStatus::Challenged,
            body: None,
        }
    }

    pub fn failed(http_status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            status: PageStatus::Failed {
                http_status,
                reason: reason.into(),
            },
            body: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PageStatus::Ok
    }

    /// True when the source is actively refusing us (challenge or 403),
    /// as opposed to a transient transport problem.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self.status,
            PageStatus::Challenged
                | PageStatus::Failed {
                    http_status: Some(403),
                    ..
                }
        )
    }

    /// Short human-readable reason for logs and comment lines.
    pub fn describe(&self) -> String {
        match &self.status {
            PageStatus::Ok => "ok".to_string(),
            PageStatus::Challenged => "challenge/robot page detected".to_string(),
            PageStatus::Failed { reason, .. } => reason.clone(),
        }
    }

    /// Consume the result, yielding the body only for normal content.
    pub fn into_body(self) -> Option<String> {
        match self.status {
            PageStatus::Ok => self.body,
            _ => None,
        }
    }
}
