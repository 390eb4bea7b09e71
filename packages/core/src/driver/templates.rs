//! Built-in driver templates and minijinja setup

use minijinja::{Environment, Error as JinjaError, ErrorKind, context};
use serde::Serialize;

use super::error::RenderError;
use crate::host::Host;
use crate::task::{DEFAULT_PREFIX_LOCAL, Task};

/// Name under which the environment prelude is registered
pub const ENVIRONMENT_TEMPLATE: &str = "environment";

/// Exports describing the task and target host
const ENVIRONMENT: &str = r#"{% if task.namespace %}
export ESSH_NAMESPACE_NAME={{ task.namespace | shell_escape }}
{% endif %}
export ESSH_TASK_NAME={{ task.name | shell_escape }}
{% if ssh_config %}
export ESSH_SSH_CONFIG={{ ssh_config | shell_escape }}
{% endif %}
export ESSH_DEBUG="{{ "1" if debug else "" }}"
{% for key, value in task.props | items %}
export ESSH_TASK_PROPS_{{ key | env_key }}={{ value | shell_escape }}
{% endfor %}
{% if payload is not none %}
export ESSH_PAYLOAD={{ payload | shell_escape }}
{% endif %}
{% if host %}
export ESSH_HOSTNAME={{ host.name | shell_escape }}
{% for key, value in host.params | items %}
export ESSH_HOST_SSH_{{ key | env_key }}={{ value | shell_escape }}
{% endfor %}
{% for key, value in host.props | items %}
export ESSH_HOST_PROPS_{{ key | env_key }}={{ value | shell_escape }}
{% endfor %}
{% for tag in host.tags %}
export ESSH_HOST_TAGS_{{ tag | env_key }}=1
{% endfor %}
{% endif %}
"#;

/// `default` driver: fragments concatenated one per line
pub const DEFAULT_ENGINE: &str = r#"{% include "environment" %}
{% for script in scripts %}
{{ script.code }}
{% endfor %}
"#;

/// `bash` driver: each fragment runs only while every earlier one succeeded;
/// the script exits with the first non-zero status.
pub const BASH_ENGINE: &str = r#"{% include "environment" %}
__essh_var_status=0
{% for script in scripts %}
if [ $__essh_var_status -eq 0 ]; then
{{ script.code }}
__essh_var_status=$?
fi
{% endfor %}
exit $__essh_var_status
"#;

/// Build the environment shared by every driver
pub fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);

    env.add_filter("shell_escape", shell_escape);
    env.add_filter("env_key", env_key);

    // Static source, parse failure here is a bug in this file
    if let Err(e) = env.add_template(ENVIRONMENT_TEMPLATE, ENVIRONMENT) {
        tracing::error!("Built-in environment template is invalid: {}", e);
    }

    env
}

/// Quote a value for safe use as a single shell word
pub fn shell_escape(value: String) -> Result<String, JinjaError> {
    shlex::try_quote(&value)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| JinjaError::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Turn a key into an environment variable suffix
pub fn env_key(value: String) -> String {
    value.to_uppercase().replace(['-', '.'], "_")
}

#[derive(Serialize)]
struct PrefixHost<'a> {
    name: &'a str,
    description: &'a str,
    tags: &'a [String],
}

/// Render the output-line prefix for one run of a task
///
/// A local task using the default prefix with no host gets a plain `[local] `.
pub fn render_prefix(task: &Task, host: Option<&Host>) -> Result<String, RenderError> {
    let Some(template) = task.prefix.as_deref() else {
        return Ok(String::new());
    };

    if host.is_none() && template == DEFAULT_PREFIX_LOCAL {
        return Ok("[local] ".to_string());
    }

    let host = host.map(|h| PrefixHost {
        name: &h.name,
        description: &h.description,
        tags: &h.tags,
    });

    let env = Environment::new();
    env.render_str(
        template,
        context! {
            host => host,
            task => context! { name => task.public_name(), description => &task.description },
        },
    )
    .map_err(|e| RenderError::Prefix {
        task: task.public_name(),
        message: e.to_string(),
    })
}
