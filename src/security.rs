//! Security scheme generation from the compact `AUTH` annotation.
//!
//! The annotation is YAML. A single string is one scheme named `auth`; a
//! mapping declares one scheme per key, each either in compact form
//! (`"header,X-Api-Key"`), as a full scheme object, or as OAuth2 shorthand:
//!
//! ```yaml
//! oauth:
//!   flow: authorizationCode
//!   authUrl: https://example.com/authorize
//!   tokenUrl: https://example.com/token
//!   scopes:
//!     read: read access
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// Scheme name used when the annotation is a single string
pub const DEFAULT_SCHEME_NAME: &str = "auth";

/// Scheme name to required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI security scheme object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scopes: IndexMap<String, String>,
}

/// Reads a scope map, treating a scope without a description as `""`
fn deserialize_scopes<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let scopes = Option::<IndexMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(scopes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, description)| (name, description.unwrap_or_default()))
        .collect())
}

/// Schemes and the requirements derived from them, both in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityDefinitions {
    pub schemes: IndexMap<String, SecurityScheme>,
    pub requirements: Vec<SecurityRequirement>,
}

impl SecurityScheme {
    fn http(scheme: &str) -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: Some(scheme.to_string()),
            ..Default::default()
        }
    }

    fn api_key(location: &str, name: &str) -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            location: Some(location.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn open_id_connect(url: &str) -> Self {
        Self {
            scheme_type: "openIdConnect".to_string(),
            open_id_connect_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    /// Checks that the scheme carries the fields its type requires.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.scheme_type.as_str() {
            "apiKey" => {
                if self.name.as_deref().unwrap_or_default().is_empty() {
                    return Err("apiKey scheme needs a name".to_string());
                }
                match self.location.as_deref() {
                    Some("query" | "header" | "cookie") => Ok(()),
                    other => Err(format!("apiKey location {:?} is not query, header or cookie", other)),
                }
            }
            "http" => match self.scheme.as_deref() {
                Some(scheme) if !scheme.is_empty() => {
                    if self.bearer_format.is_some() && !scheme.eq_ignore_ascii_case("bearer") {
                        return Err(format!("bearerFormat is only valid for bearer, not {}", scheme));
                    }
                    Ok(())
                }
                _ => Err("http scheme needs a scheme".to_string()),
            },
            "oauth2" => match &self.flows {
                Some(flows) => flows.validate(),
                None => Err("oauth2 scheme needs flows".to_string()),
            },
            "openIdConnect" => match self.open_id_connect_url.as_deref() {
                Some(url) if !url.is_empty() => Ok(()),
                _ => Err("openIdConnect scheme needs an openIdConnectUrl".to_string()),
            },
            other => Err(format!("unknown security scheme type {:?}", other)),
        }
    }

    /// Scopes required by the scheme: those of its highest priority flow.
    pub fn required_scopes(&self) -> Vec<String> {
        self.flows
            .as_ref()
            .and_then(OAuthFlows::primary)
            .map(|flow| flow.scopes.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl OAuthFlows {
    /// The flow whose scopes a requirement uses: authorization code, then
    /// client credentials, then implicit, then password.
    pub fn primary(&self) -> Option<&OAuthFlow> {
        self.authorization_code
            .as_ref()
            .or(self.client_credentials.as_ref())
            .or(self.implicit.as_ref())
            .or(self.password.as_ref())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let flows = [
            ("implicit", &self.implicit, true, false),
            ("password", &self.password, false, true),
            ("clientCredentials", &self.client_credentials, false, true),
            ("authorizationCode", &self.authorization_code, true, true),
        ];

        let mut present = 0;
        for (name, flow, needs_authorization_url, needs_token_url) in flows {
            let Some(flow) = flow else {
                continue;
            };
            present += 1;
            if needs_authorization_url && flow.authorization_url.is_none() {
                return Err(format!("{} flow needs an authorizationUrl", name));
            }
            if needs_token_url && flow.token_url.is_none() {
                return Err(format!("{} flow needs a tokenUrl", name));
            }
        }

        if present == 0 {
            return Err("oauth2 scheme needs at least one flow".to_string());
        }
        Ok(())
    }

    fn set(&mut self, name: &str, flow: OAuthFlow) -> std::result::Result<(), String> {
        let slot = match name {
            "implicit" => &mut self.implicit,
            "password" => &mut self.password,
            "clientCredentials" => &mut self.client_credentials,
            "authorizationCode" => &mut self.authorization_code,
            other => return Err(format!("unknown oauth2 flow {:?}", other)),
        };
        *slot = Some(flow);
        Ok(())
    }
}

/// Builds security schemes and requirements from the annotation text.
pub fn generate_security_schemes(text: &str) -> Result<SecurityDefinitions> {
    let value: Value =
        serde_yaml::from_str(text).map_err(|e| invalid(DEFAULT_SCHEME_NAME, e.to_string()))?;

    let mut schemes = IndexMap::new();
    match value {
        Value::Null => {}
        Value::String(compact) => {
            let scheme = parse_compact_scheme(&compact)
                .map_err(|message| invalid(DEFAULT_SCHEME_NAME, message))?;
            schemes.insert(DEFAULT_SCHEME_NAME.to_string(), scheme);
        }
        Value::Mapping(entries) => {
            for (key, value) in entries {
                let name = match key {
                    Value::String(name) => name,
                    other => {
                        return Err(invalid(
                            &format!("{:?}", other),
                            "scheme names must be strings".to_string(),
                        ))
                    }
                };
                let scheme = scheme_from_value(&value).map_err(|message| invalid(&name, message))?;
                schemes.insert(name, scheme);
            }
        }
        other => {
            return Err(invalid(
                DEFAULT_SCHEME_NAME,
                format!("expected a string or a mapping, got {:?}", other),
            ))
        }
    }

    let requirements = schemes
        .iter()
        .map(|(name, scheme)| {
            let mut requirement = SecurityRequirement::new();
            requirement.insert(name.clone(), scheme.required_scopes());
            requirement
        })
        .collect();

    debug!("Generated {} security schemes", schemes.len());
    Ok(SecurityDefinitions {
        schemes,
        requirements,
    })
}

fn invalid(name: &str, message: String) -> Error {
    Error::InvalidSecurityScheme {
        name: name.to_string(),
        message,
    }
}

fn scheme_from_value(value: &Value) -> std::result::Result<SecurityScheme, String> {
    match value {
        Value::String(compact) => parse_compact_scheme(compact),
        Value::Mapping(mapping) => {
            let full = serde_yaml::from_value::<SecurityScheme>(value.clone())
                .map_err(|e| e.to_string())
                .and_then(|scheme| scheme.validate().map(|_| scheme));
            match full {
                Ok(scheme) => Ok(scheme),
                Err(reason) => {
                    debug!("Not a full security scheme ({}), reading as oauth2 shorthand", reason);
                    oauth2_shorthand(mapping)
                }
            }
        }
        other => Err(format!("unsupported scheme value {:?}", other)),
    }
}

/// Assembles an oauth2 scheme from `flow`, `authUrl`/`authorizationUrl`,
/// `tokenUrl`, `refreshUrl` and `scopes`.
fn oauth2_shorthand(mapping: &Mapping) -> std::result::Result<SecurityScheme, String> {
    let mut flow_name = None;
    let mut flow = OAuthFlow::default();

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        match key {
            "flow" => flow_name = Some(string_field(key, value)?),
            "authUrl" | "authorizationUrl" => flow.authorization_url = Some(string_field(key, value)?),
            "tokenUrl" => flow.token_url = Some(string_field(key, value)?),
            "refreshUrl" => flow.refresh_url = Some(string_field(key, value)?),
            "scopes" => {
                flow.scopes = deserialize_scopes(value.clone())
                    .map_err(|e| format!("invalid scopes: {}", e))?
            }
            _ => {}
        }
    }

    let flow_name = flow_name.ok_or_else(|| "oauth2 shorthand needs a flow".to_string())?;
    let mut flows = OAuthFlows::default();
    flows.set(&flow_name, flow)?;

    Ok(SecurityScheme {
        scheme_type: "oauth2".to_string(),
        flows: Some(flows),
        ..Default::default()
    })
}

fn string_field(key: &str, value: &Value) -> std::result::Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("{} must be a string", key))
}

/// Parses the comma separated compact form, e.g. `bearer,JWT`,
/// `apiKey,header,X-Key`, `cookie,session` or `oidc,https://...`.
pub fn parse_compact_scheme(text: &str) -> std::result::Result<SecurityScheme, String> {
    let cells = split_cells(text)?;
    let cell = |index: usize| {
        cells
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("{:?} needs at least {} cells", text, index + 1))
    };

    let kind = cell(0)?;
    match kind {
        "basic" | "bearer" => {
            let mut scheme = SecurityScheme::http(kind);
            scheme.bearer_format = cells.get(1).cloned();
            Ok(scheme)
        }
        "jwt" => {
            let mut scheme = SecurityScheme::http("bearer");
            scheme.bearer_format = Some("JWT".to_string());
            Ok(scheme)
        }
        "apiKey" => {
            let scheme = SecurityScheme::api_key(cell(1)?, cell(2)?);
            scheme.validate()?;
            Ok(scheme)
        }
        "cookie" | "query" | "header" => Ok(SecurityScheme::api_key(kind, cell(1)?)),
        "oidc" | "openIdConnect" => Ok(SecurityScheme::open_id_connect(cell(1)?)),
        other => Err(format!("unknown security scheme kind {:?}", other)),
    }
}

/// Splits a single CSV record. Double quoted cells may contain commas and
/// `""` escapes. Cells are trimmed.
fn split_cells(text: &str) -> std::result::Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => cells.push(std::mem::take(&mut current).trim().to_string()),
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(format!("unterminated quote in {:?}", text));
    }
    cells.push(current.trim().to_string());
    Ok(cells)
}
