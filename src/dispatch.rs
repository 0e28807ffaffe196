// cio - CLI for the Customer.io App API
// Copyright (C) 2024 The cio contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::body::{BodyError, BodySource};
use crate::client::{ApiClient, EndpointCall, HttpMethod};
use crate::endpoints::{Action, BodyRule, Endpoint};
use crate::output::OutputOptions;
use anyhow::Result;
use std::io::Write;
use tracing::debug;

/// Values parsed from one endpoint subcommand.
#[derive(Debug, Default, Clone)]
pub struct Request {
    pub args: Vec<String>,
    pub body: Option<String>,
    pub query: Option<String>,
}

/// Turn a table entry plus its arguments into a concrete call.
///
/// Body resolution happens here, so a missing required body fails before
/// any client exists.
pub fn plan<B: BodySource>(
    endpoint: &Endpoint,
    request: &Request,
    source: &mut B,
) -> Result<EndpointCall, BodyError> {
    let path = endpoint.fill_path(request.args.as_slice());
    let flag = request.body.as_deref();

    let call = match endpoint.action {
        Action::Get => EndpointCall::new(HttpMethod::Get, path),
        Action::Delete => EndpointCall::new(HttpMethod::Delete, path),
        Action::Post(rule) => {
            EndpointCall::new(HttpMethod::Post, path).with_body(body_for(rule, source, flag)?)
        }
        Action::Put(rule) => {
            EndpointCall::new(HttpMethod::Put, path).with_body(body_for(rule, source, flag)?)
        }
        Action::GetOrPut => match source.resolve(flag)? {
            Some(body) => EndpointCall::new(HttpMethod::Put, path).with_body(Some(body)),
            None => EndpointCall::new(HttpMethod::Get, path),
        },
        Action::QueryOrPost { param, .. } => match request.query.as_deref() {
            Some(value) if !value.is_empty() => {
                EndpointCall::new(HttpMethod::Get, path).with_query(param, value)
            }
            _ => EndpointCall::new(HttpMethod::Post, path).with_body(Some(source.require(flag)?)),
        },
    };
    Ok(call)
}

fn body_for<B: BodySource>(
    rule: BodyRule,
    source: &mut B,
    flag: Option<&str>,
) -> Result<Option<Vec<u8>>, BodyError> {
    match rule {
        BodyRule::Required => source.require(flag).map(Some),
        BodyRule::Optional => source.resolve(flag),
        BodyRule::EmptyObject => Ok(Some(
            source.resolve(flag)?.unwrap_or_else(|| b"{}".to_vec()),
        )),
    }
}

/// Plan, connect, execute, render. `connect` runs only once the call is valid.
pub fn run<B, C, W>(
    endpoint: &Endpoint,
    request: &Request,
    source: &mut B,
    connect: C,
    output: &OutputOptions,
    out: &mut W,
) -> Result<()>
where
    B: BodySource,
    C: FnOnce() -> Result<ApiClient>,
    W: Write,
{
    let call = plan(endpoint, request, source)?;
    debug!(endpoint = endpoint.name, method = ?call.method, path = %call.path, "dispatching");

    let client = connect()?;
    let payload = client.execute(&call)?;
    output.render(out, &payload)?;
    Ok(())
}
