//! Placeholder substitution in container environment values.

use k8s_openapi::api::core::v1::{Container, PodSpec};

/// Replace every occurrence of `token` with `index` in the env values of
/// all containers and init containers of `pod`.
///
/// Values without the token, and env vars sourced through `valueFrom`,
/// are left untouched. Returns the number of values rewritten.
pub fn substitute_pod(pod: &mut PodSpec, token: &str, index: &str) -> usize {
    let init = pod.init_containers.iter_mut().flatten();
    substitute_containers(pod.containers.iter_mut().chain(init), token, index)
}

fn substitute_containers<'a>(
    containers: impl Iterator<Item = &'a mut Container>,
    token: &str,
    index: &str,
) -> usize {
    let mut rewritten = 0;
    for container in containers {
        for var in container.env.iter_mut().flatten() {
            if let Some(value) = var.value.as_mut() {
                if value.contains(token) {
                    *value = value.replace(token, index);
                    rewritten += 1;
                }
            }
        }
    }
    rewritten
}
