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

//! Static table of every API command, grouped the way the CLI exposes them.
//!
//! Each path template uses `{}` placeholders filled positionally from the
//! command's arguments.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// What to do when a body-carrying command resolves no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRule {
    /// Fail before any request is made.
    Required,
    /// Send the request with an empty payload.
    Optional,
    /// Send `{}`.
    EmptyObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Delete,
    Post(BodyRule),
    Put(BodyRule),
    /// PUT when a body is supplied, GET otherwise.
    GetOrPut,
    /// GET with `param=<value>` when `--<flag>` is given, otherwise POST a required body.
    QueryOrPost {
        flag: &'static str,
        param: &'static str,
        help: &'static str,
    },
}

impl Action {
    pub fn accepts_body(self) -> bool {
        !matches!(self, Action::Get | Action::Delete)
    }
}

#[derive(Debug)]
pub struct Endpoint {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub about: &'static str,
    pub args: &'static [&'static str],
    pub path: &'static str,
    pub action: Action,
}

#[derive(Debug)]
pub struct Group {
    pub name: &'static str,
    pub about: &'static str,
    pub endpoints: &'static [Endpoint],
}

const fn endpoint(
    name: &'static str,
    about: &'static str,
    args: &'static [&'static str],
    path: &'static str,
    action: Action,
) -> Endpoint {
    Endpoint {
        name,
        aliases: &[],
        about,
        args,
        path,
        action,
    }
}

const fn get(
    name: &'static str,
    about: &'static str,
    args: &'static [&'static str],
    path: &'static str,
) -> Endpoint {
    endpoint(name, about, args, path, Action::Get)
}

const fn get_or_put(
    name: &'static str,
    about: &'static str,
    args: &'static [&'static str],
    path: &'static str,
) -> Endpoint {
    endpoint(name, about, args, path, Action::GetOrPut)
}

const fn post(name: &'static str, about: &'static str, path: &'static str) -> Endpoint {
    endpoint(name, about, &[], path, Action::Post(BodyRule::Required))
}

const ID: &[&str] = &["id"];

/// `ls` with its `list` alias.
const fn list(about: &'static str, path: &'static str) -> Endpoint {
    Endpoint {
        aliases: &["list"],
        ..get("ls", about, &[], path)
    }
}

/// `rm <arg>` with its `delete` alias.
const fn remove(
    about: &'static str,
    args: &'static [&'static str],
    path: &'static str,
) -> Endpoint {
    Endpoint {
        aliases: &["delete"],
        ..endpoint("rm", about, args, path, Action::Delete)
    }
}

pub static GROUPS: &[Group] = &[
    Group {
        name: "activities",
        about: "Manage activities",
        endpoints: &[list("List activities", "/v1/activities")],
    },
    Group {
        name: "broadcasts",
        about: "Manage broadcasts",
        endpoints: &[
            list("List broadcasts", "/v1/broadcasts"),
            get("get", "Get a broadcast", ID, "/v1/broadcasts/{}"),
            endpoint(
                "trigger",
                "Trigger a broadcast",
                ID,
                "/v1/campaigns/{}/triggers",
                Action::Post(BodyRule::EmptyObject),
            ),
            get("triggers", "List broadcast triggers", ID, "/v1/broadcasts/{}/triggers"),
            get(
                "trigger-status",
                "Get broadcast trigger status",
                &["id", "trigger-id"],
                "/v1/broadcasts/{}/triggers/{}",
            ),
            get(
                "trigger-errors",
                "Get broadcast trigger errors",
                &["id", "trigger-id"],
                "/v1/broadcasts/{}/triggers/{}/errors",
            ),
            get("actions", "List broadcast actions", ID, "/v1/broadcasts/{}/actions"),
            get_or_put(
                "action",
                "Get or update a broadcast action",
                &["id", "action-id"],
                "/v1/broadcasts/{}/actions/{}",
            ),
            get("metrics", "Get broadcast metrics", ID, "/v1/broadcasts/{}/metrics"),
            get(
                "link-metrics",
                "Get broadcast link metrics",
                ID,
                "/v1/broadcasts/{}/metrics/links",
            ),
            get(
                "action-metrics",
                "Get broadcast action metrics",
                &["id", "action-id"],
                "/v1/broadcasts/{}/actions/{}/metrics",
            ),
            get(
                "action-link-metrics",
                "Get broadcast action link metrics",
                &["id", "action-id"],
                "/v1/broadcasts/{}/actions/{}/metrics/links",
            ),
            get("messages", "Get broadcast messages", ID, "/v1/broadcasts/{}/messages"),
            get_or_put(
                "translation",
                "Get or update a broadcast translation",
                &["id", "action-id", "lang"],
                "/v1/broadcasts/{}/actions/{}/language/{}",
            ),
        ],
    },
    Group {
        name: "campaigns",
        about: "Manage campaigns",
        endpoints: &[
            list("List campaigns", "/v1/campaigns"),
            get("get", "Get a campaign", ID, "/v1/campaigns/{}"),
            get("actions", "List campaign actions", ID, "/v1/campaigns/{}/actions"),
            get_or_put(
                "action",
                "Get or update a campaign action",
                &["id", "action-id"],
                "/v1/campaigns/{}/actions/{}",
            ),
            get("metrics", "Get campaign metrics", ID, "/v1/campaigns/{}/metrics"),
            get(
                "link-metrics",
                "Get campaign link metrics",
                ID,
                "/v1/campaigns/{}/metrics/links",
            ),
            get(
                "action-metrics",
                "Get campaign action metrics",
                &["id", "action-id"],
                "/v1/campaigns/{}/actions/{}/metrics",
            ),
            get(
                "action-link-metrics",
                "Get campaign action link metrics",
                &["id", "action-id"],
                "/v1/campaigns/{}/actions/{}/metrics/links",
            ),
            get(
                "journey-metrics",
                "Get campaign journey metrics",
                ID,
                "/v1/campaigns/{}/journey_metrics",
            ),
            get("messages", "Get campaign messages", ID, "/v1/campaigns/{}/messages"),
            get_or_put(
                "translation",
                "Get or update a campaign translation",
                &["id", "action-id", "lang"],
                "/v1/campaigns/{}/actions/{}/language/{}",
            ),
        ],
    },
    Group {
        name: "collections",
        about: "Manage collections",
        endpoints: &[
            list("List collections", "/v1/collections"),
            get("get", "Get a collection", ID, "/v1/collections/{}"),
            post("create", "Create a collection", "/v1/collections"),
            endpoint(
                "update",
                "Update a collection",
                ID,
                "/v1/collections/{}",
                Action::Put(BodyRule::Required),
            ),
            remove("Delete a collection", ID, "/v1/collections/{}"),
            get_or_put(
                "content",
                "Get or update collection content",
                ID,
                "/v1/collections/{}/content",
            ),
        ],
    },
    Group {
        name: "customers",
        about: "Manage customers",
        endpoints: &[
            get("get", "Get customer attributes", ID, "/v1/customers/{}/attributes"),
            endpoint(
                "search",
                "Search customers by email or filter",
                &[],
                "/v1/customers",
                Action::QueryOrPost {
                    flag: "email",
                    param: "email",
                    help: "Search by email address",
                },
            ),
            Endpoint {
                aliases: &["list"],
                ..post("ls", "List customers by attributes", "/v1/customers/attributes")
            },
            get(
                "activities",
                "Get customer activities",
                ID,
                "/v1/customers/{}/activities",
            ),
            get("messages", "Get customer messages", ID, "/v1/customers/{}/messages"),
            get("segments", "Get customer segments", ID, "/v1/customers/{}/segments"),
            get(
                "relationships",
                "Get customer relationships",
                ID,
                "/v1/customers/{}/relationships",
            ),
            get(
                "sub-prefs",
                "Get customer subscription preferences",
                ID,
                "/v1/customers/{}/subscription_preferences",
            ),
        ],
    },
    Group {
        name: "esp-suppression",
        about: "Manage ESP suppressions",
        endpoints: &[
            endpoint(
                "search",
                "Search ESP suppressions",
                &[],
                "/v1/esp_suppression/search",
                Action::Post(BodyRule::EmptyObject),
            ),
            get(
                "get",
                "Get ESP suppression for an email",
                &["email"],
                "/v1/esp_suppression/{}",
            ),
            endpoint(
                "suppress",
                "Suppress an email",
                &["email"],
                "/v1/esp_suppression/{}",
                Action::Put(BodyRule::Optional),
            ),
            endpoint(
                "unsuppress",
                "Unsuppress an email",
                &["email"],
                "/v1/esp_suppression/{}",
                Action::Delete,
            ),
        ],
    },
    Group {
        name: "exports",
        about: "Manage exports",
        endpoints: &[
            list("List exports", "/v1/exports"),
            post(
                "create-customers",
                "Create a customer export",
                "/v1/exports/customers",
            ),
            post(
                "create-deliveries",
                "Create a deliveries export",
                "/v1/exports/deliveries",
            ),
            get("get", "Get an export", ID, "/v1/exports/{}"),
            get("download", "Download an export", ID, "/v1/exports/{}/download"),
        ],
    },
    Group {
        name: "imports",
        about: "Manage imports",
        endpoints: &[
            post("create", "Create an import", "/v1/imports"),
            get("get", "Get an import", ID, "/v1/imports/{}"),
        ],
    },
    Group {
        name: "index",
        about: "Data index lookups",
        endpoints: &[
            get("attributes", "List indexed attributes", &[], "/v1/index/attributes"),
            get("events", "List indexed events", &[], "/v1/index/events"),
        ],
    },
    Group {
        name: "info",
        about: "General information",
        endpoints: &[get(
            "ip-addresses",
            "Get IP addresses",
            &[],
            "/v1/info/ip_addresses",
        )],
    },
    Group {
        name: "messages",
        about: "Manage messages",
        endpoints: &[
            list("List messages", "/v1/messages"),
            get("get", "Get a message", ID, "/v1/messages/{}"),
            get(
                "archived",
                "Get archived message",
                ID,
                "/v1/messages/{}/archived_message",
            ),
        ],
    },
    Group {
        name: "newsletters",
        about: "Manage newsletters",
        endpoints: &[
            list("List newsletters", "/v1/newsletters"),
            get("get", "Get a newsletter", ID, "/v1/newsletters/{}"),
            remove("Delete a newsletter", ID, "/v1/newsletters/{}"),
            get(
                "contents",
                "List newsletter contents",
                ID,
                "/v1/newsletters/{}/contents",
            ),
            get_or_put(
                "content",
                "Get or update newsletter content",
                &["id", "content-id"],
                "/v1/newsletters/{}/contents/{}",
            ),
            get("metrics", "Get newsletter metrics", ID, "/v1/newsletters/{}/metrics"),
            get(
                "link-metrics",
                "Get newsletter link metrics",
                ID,
                "/v1/newsletters/{}/metrics/links",
            ),
            get(
                "content-metrics",
                "Get newsletter content metrics",
                &["id", "content-id"],
                "/v1/newsletters/{}/contents/{}/metrics",
            ),
            get(
                "content-link-metrics",
                "Get newsletter content link metrics",
                &["id", "content-id"],
                "/v1/newsletters/{}/contents/{}/metrics/links",
            ),
            get(
                "messages",
                "Get newsletter messages",
                ID,
                "/v1/newsletters/{}/messages",
            ),
            get_or_put(
                "translation",
                "Get or update a newsletter translation",
                &["id", "lang"],
                "/v1/newsletters/{}/language/{}",
            ),
            get(
                "test-groups",
                "Get newsletter test groups",
                ID,
                "/v1/newsletters/{}/test_groups",
            ),
            get_or_put(
                "test-group-translation",
                "Get or update a newsletter test group translation",
                &["id", "group-id", "lang"],
                "/v1/newsletters/{}/test_groups/{}/language/{}",
            ),
        ],
    },
    Group {
        name: "objects",
        about: "Manage objects",
        endpoints: &[
            get("types", "List object types", &[], "/v1/object_types"),
            endpoint(
                "search",
                "Search objects",
                &[],
                "/v1/objects",
                Action::Post(BodyRule::EmptyObject),
            ),
            get(
                "get",
                "Get object attributes",
                &["type-id", "object-id"],
                "/v1/objects/{}/{}/attributes",
            ),
            get(
                "relationships",
                "Get object relationships",
                &["type-id", "object-id"],
                "/v1/objects/{}/{}/relationships",
            ),
        ],
    },
    Group {
        name: "segments",
        about: "Manage segments",
        endpoints: &[
            list("List segments", "/v1/segments"),
            get("get", "Get a segment", ID, "/v1/segments/{}"),
            post("create", "Create a segment", "/v1/segments"),
            remove("Delete a segment", ID, "/v1/segments/{}"),
            get(
                "count",
                "Get segment customer count",
                ID,
                "/v1/segments/{}/customer_count",
            ),
            get("members", "Get segment membership", ID, "/v1/segments/{}/membership"),
            get("deps", "Get segment dependencies", ID, "/v1/segments/{}/dependencies"),
        ],
    },
    Group {
        name: "send",
        about: "Send messages",
        endpoints: &[
            post("email", "Send an email", "/v1/send/email"),
            post("push", "Send a push notification", "/v1/send/push"),
            post("sms", "Send an SMS", "/v1/send/sms"),
        ],
    },
    Group {
        name: "sender-identities",
        about: "Manage sender identities",
        endpoints: &[
            list("List sender identities", "/v1/sender_identities"),
            get("get", "Get a sender identity", ID, "/v1/sender_identities/{}"),
            get(
                "used-by",
                "Get sender identity usage",
                ID,
                "/v1/sender_identities/{}/used_by",
            ),
        ],
    },
    Group {
        name: "snippets",
        about: "Manage snippets",
        endpoints: &[
            list("List snippets", "/v1/snippets"),
            endpoint(
                "upsert",
                "Create or update snippets",
                &[],
                "/v1/snippets",
                Action::Put(BodyRule::Required),
            ),
            remove("Delete a snippet", &["name"], "/v1/snippets/{}"),
        ],
    },
    Group {
        name: "subscription-topics",
        about: "Manage subscription topics",
        endpoints: &[list("List subscription topics", "/v1/subscription_topics")],
    },
    Group {
        name: "transactional",
        about: "Manage transactional messages",
        endpoints: &[
            list("List transactional messages", "/v1/transactional"),
            get("get", "Get a transactional message", ID, "/v1/transactional/{}"),
            get(
                "metrics",
                "Get transactional message metrics",
                ID,
                "/v1/transactional/{}/metrics",
            ),
            get(
                "link-metrics",
                "Get transactional message link metrics",
                ID,
                "/v1/transactional/{}/metrics/links",
            ),
            get_or_put(
                "content",
                "Get or update transactional message content",
                ID,
                "/v1/transactional/{}/content",
            ),
            get_or_put(
                "translation",
                "Get or update transactional message translation",
                &["id", "lang"],
                "/v1/transactional/{}/language/{}",
            ),
            get(
                "deliveries",
                "Get transactional message deliveries",
                ID,
                "/v1/transactional/{}/deliveries",
            ),
        ],
    },
    Group {
        name: "webhooks",
        about: "Manage reporting webhooks",
        endpoints: &[
            list("List reporting webhooks", "/v1/reporting_webhooks"),
            get_or_put(
                "get",
                "Get or update a reporting webhook",
                ID,
                "/v1/reporting_webhooks/{}",
            ),
            post("create", "Create a reporting webhook", "/v1/reporting_webhooks"),
            remove("Delete a reporting webhook", ID, "/v1/reporting_webhooks/{}"),
        ],
    },
];

/// Unreserved path characters, plus `@` so email addresses stay readable.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@');

impl Endpoint {
    /// Substitute each `{}` with the next argument, percent-encoded as a path segment.
    pub fn fill_path<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut filled = String::with_capacity(self.path.len());
        let mut values = args.iter();
        let mut pieces = self.path.split("{}").peekable();
        while let Some(piece) = pieces.next() {
            filled.push_str(piece);
            if pieces.peek().is_some() {
                if let Some(value) = values.next() {
                    filled.extend(utf8_percent_encode(value.as_ref(), PATH_SEGMENT));
                }
            }
        }
        filled
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

pub fn group(name: &str) -> Option<&'static Group> {
    GROUPS.iter().find(|g| g.name == name)
}

pub fn find(group_name: &str, command: &str) -> Option<&'static Endpoint> {
    group(group_name)?.endpoints.iter().find(|e| e.matches(command))
}
