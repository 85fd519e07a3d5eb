//! Upstream header construction. The Kiro service expects the exact header
//! set its own desktop client sends.

use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONNECTION,
    CONTENT_TYPE, HOST, USER_AGENT,
};
use uuid::Uuid;

const SDK_VERSION: &str = "aws-sdk-js/1.0.27";

pub fn upstream_host(region: &str) -> String {
    format!("q.{region}.amazonaws.com")
}

pub fn upstream_url(region: &str) -> String {
    format!("https://{}/generateAssistantResponse", upstream_host(region))
}

/// Full request header set. The invocation id is fresh per call.
pub fn build_headers(
    token: &str,
    machine_id: &str,
    region: &str,
    kiro_version: &str,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let ide_tag = format!("KiroIDE-{kiro_version}-{machine_id}");

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    headers.insert(HOST, HeaderValue::from_str(&upstream_host(region))?);
    headers.insert(
        HeaderName::from_static("x-amzn-codewhisperer-optout"),
        HeaderValue::from_static("true"),
    );
    headers.insert(
        HeaderName::from_static("x-amzn-kiro-agent-mode"),
        HeaderValue::from_static("vibe"),
    );
    headers.insert(
        HeaderName::from_static("x-amz-user-agent"),
        HeaderValue::from_str(&format!("{SDK_VERSION} {ide_tag}"))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!(
            "{SDK_VERSION} ua/2.1 os/windows lang/js md/nodejs#20.0.0 api/codewhispererstreaming#1.0.27 m/E {ide_tag}"
        ))?,
    );
    headers.insert(
        HeaderName::from_static("amz-sdk-invocation-id"),
        HeaderValue::from_str(&Uuid::new_v4().to_string())?,
    );
    headers.insert(
        HeaderName::from_static("amz-sdk-request"),
        HeaderValue::from_static("attempt=1; max=3"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    Ok(headers)
}

/// 32 random bytes as hex, standing in for a credential without a machine id.
pub fn fresh_machine_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}
