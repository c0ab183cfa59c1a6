//! Expander — fans a replicated template out into single-replica instances.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info};

use fanout_core::FanoutConfig;

use crate::error::{ExpandError, ExpandResult};
use crate::placeholder::substitute_pod;

/// Token replaced by the instance index in env values.
pub const DEFAULT_PLACEHOLDER: &str = "###";

/// Label key carrying the instance index.
pub const DEFAULT_REPLICA_LABEL: &str = "replica";

/// Joins the template name and the instance index.
pub const DEFAULT_SEPARATOR: &str = "-";

/// Knobs for expansion. The defaults reproduce `name-i` / `replica=i` / `###`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    pub placeholder: String,
    pub replica_label: String,
    pub separator: String,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            replica_label: DEFAULT_REPLICA_LABEL.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ExpandOptions {
    /// Build options from the `[expand]` section, falling back to defaults.
    pub fn from_config(config: &FanoutConfig) -> Self {
        let mut options = Self::default();
        if let Some(expand) = &config.expand {
            if let Some(placeholder) = &expand.placeholder {
                options.placeholder = placeholder.clone();
            }
            if let Some(label) = &expand.replica_label {
                options.replica_label = label.clone();
            }
            if let Some(separator) = &expand.separator {
                options.separator = separator.clone();
            }
        }
        options
    }

    fn validate(&self) -> ExpandResult<()> {
        if self.placeholder.is_empty() {
            return Err(ExpandError::EmptyPlaceholder);
        }
        if self.replica_label.is_empty() {
            return Err(ExpandError::EmptyLabelKey);
        }
        Ok(())
    }
}

/// Expands templates according to a fixed set of [`ExpandOptions`].
#[derive(Debug, Clone, Default)]
pub struct Expander {
    options: ExpandOptions,
}

/// Expand `template` with the default options.
pub fn expand(template: &Deployment) -> ExpandResult<Vec<Deployment>> {
    Expander::default().expand(template)
}

impl Expander {
    pub fn new(options: ExpandOptions) -> Self {
        Self { options }
    }

    /// Produce `spec.replicas` instances, index 1 first.
    ///
    /// The template itself is only read. Instances share no storage with it
    /// or with each other.
    pub fn expand(&self, template: &Deployment) -> ExpandResult<Vec<Deployment>> {
        self.options.validate()?;

        let base = template
            .metadata
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(ExpandError::MissingName)?;
        let spec = template.spec.as_ref().ok_or(ExpandError::MissingSpec)?;
        let replicas = spec.replicas.ok_or(ExpandError::MissingReplicas)?;
        if replicas < 1 {
            return Err(ExpandError::InvalidReplicas(replicas));
        }

        // Every instance runs a single replica of its own.
        let mut source = template.clone();
        if let Some(spec) = source.spec.as_mut() {
            spec.replicas = Some(1);
        }

        let instances: Vec<Deployment> = (1..=replicas)
            .map(|index| self.instance(&source, base, index))
            .collect();

        info!(
            template = %base,
            replicas,
            label = %self.options.replica_label,
            "template expanded"
        );
        Ok(instances)
    }

    fn instance(&self, source: &Deployment, base: &str, index: i32) -> Deployment {
        let index = index.to_string();
        let label = self.options.replica_label.as_str();
        let mut instance = source.clone();

        let name = format!("{base}{}{index}", self.options.separator);
        stamp(&mut instance.metadata.labels, label, &index);
        instance.metadata.name = Some(name);

        let mut rewritten = 0;
        if let Some(spec) = instance.spec.as_mut() {
            stamp(&mut spec.selector.match_labels, label, &index);
            let pod_meta = spec.template.metadata.get_or_insert_with(ObjectMeta::default);
            stamp(&mut pod_meta.labels, label, &index);

            if let Some(pod) = spec.template.spec.as_mut() {
                rewritten = substitute_pod(pod, &self.options.placeholder, &index);
            }
        }

        debug!(
            name = instance.metadata.name.as_deref().unwrap_or_default(),
            %index,
            env_rewritten = rewritten,
            "instance generated"
        );
        instance
    }
}

/// Insert or overwrite `key=value`, creating the map when absent.
fn stamp(labels: &mut Option<BTreeMap<String, String>>, key: &str, value: &str) {
    labels
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::config::ExpandConfig;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{
        Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn var(name: &str, value: &str) -> EnvVar {
        EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        }
    }

    fn template(name: &str, replicas: Option<i32>, env: Vec<EnvVar>) -> Deployment {
        let app = labels(&[("app", name)]);
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(app.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas,
                selector: LabelSelector {
                    match_labels: Some(app.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(app),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "server".to_string(),
                            image: Some("tron:latest".to_string()),
                            env: Some(env),
                            ports: Some(vec![ContainerPort {
                                container_port: 9000,
                                ..Default::default()
                            }]),
                            resources: Some(ResourceRequirements {
                                limits: Some(
                                    [("memory".to_string(), Quantity("256Mi".to_string()))]
                                        .into_iter()
                                        .collect(),
                                ),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn env_of(instance: &Deployment) -> &Vec<EnvVar> {
        instance.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
            .env
            .as_ref()
            .unwrap()
    }

    fn env_value<'a>(instance: &'a Deployment, name: &str) -> Option<&'a str> {
        env_of(instance)
            .iter()
            .find(|v| v.name == name)
            .and_then(|v| v.value.as_deref())
    }

    fn replica_of(map: Option<&BTreeMap<String, String>>) -> Option<&str> {
        map.and_then(|m| m.get("replica")).map(String::as_str)
    }

    fn replica_labels(instance: &Deployment) -> [Option<&str>; 3] {
        let spec = instance.spec.as_ref().unwrap();
        [
            replica_of(instance.metadata.labels.as_ref()),
            replica_of(spec.selector.match_labels.as_ref()),
            replica_of(spec.template.metadata.as_ref().unwrap().labels.as_ref()),
        ]
    }

    #[test]
    fn tron_scenario() {
        let mut tron = template("tron", Some(3), vec![var("SERVER_ID", "###")]);
        tron.metadata.labels = None;

        let instances = expand(&tron).unwrap();
        assert_eq!(instances.len(), 3);

        for (position, instance) in instances.iter().enumerate() {
            let index = (position + 1).to_string();
            assert_eq!(
                instance.metadata.name.as_deref(),
                Some(format!("tron-{index}").as_str())
            );
            assert_eq!(replica_labels(instance), [Some(index.as_str()); 3]);
            assert_eq!(env_value(instance, "SERVER_ID"), Some(index.as_str()));
            assert_eq!(instance.spec.as_ref().unwrap().replicas, Some(1));
        }
    }

    #[test]
    fn names_are_ascending_and_distinct() {
        let instances = expand(&template("web", Some(12), vec![])).unwrap();
        let names: Vec<_> = instances
            .iter()
            .map(|d| d.metadata.name.clone().unwrap())
            .collect();
        let expected: Vec<_> = (1..=12).map(|i| format!("web-{i}")).collect();
        assert_eq!(names, expected);
        // Decimal, no padding.
        assert_eq!(names[9], "web-10");
    }

    #[test]
    fn selector_matches_pod_template_labels() {
        for instance in expand(&template("web", Some(4), vec![])).unwrap() {
            let spec = instance.spec.as_ref().unwrap();
            assert_eq!(
                spec.selector.match_labels,
                spec.template.metadata.as_ref().unwrap().labels
            );
            assert_eq!(
                spec.selector.match_labels.as_ref().unwrap().get("app"),
                Some(&"web".to_string())
            );
        }
    }

    #[test]
    fn overwrites_existing_replica_label() {
        let mut t = template("web", Some(2), vec![]);
        t.metadata
            .labels
            .as_mut()
            .unwrap()
            .insert("replica".to_string(), "stale".to_string());
        let instances = expand(&t).unwrap();
        assert_eq!(replica_labels(&instances[1]), [Some("2"); 3]);
    }

    #[test]
    fn creates_missing_pod_template_metadata() {
        let mut t = template("web", Some(1), vec![]);
        let spec = t.spec.as_mut().unwrap();
        spec.template.metadata = None;
        spec.selector.match_labels = None;

        let instances = expand(&t).unwrap();
        assert_eq!(replica_labels(&instances[0]), [Some("1"); 3]);
    }

    #[test]
    fn placeholder_replaced_everywhere_in_value() {
        let t = template(
            "db",
            Some(7),
            vec![var("ADDR", "id=###;host=###.local"), var("MODE", "primary")],
        );
        let instances = expand(&t).unwrap();
        assert_eq!(env_value(&instances[6], "ADDR"), Some("id=7;host=7.local"));
        for instance in &instances {
            assert_eq!(env_value(instance, "MODE"), Some("primary"));
        }
    }

    #[test]
    fn template_is_not_mutated() {
        let t = template("web", Some(3), vec![var("ID", "###")]);
        let before = t.clone();
        let _ = expand(&t).unwrap();
        assert_eq!(t, before);
        assert_eq!(t.spec.as_ref().unwrap().replicas, Some(3));
    }

    #[test]
    fn instances_do_not_alias() {
        let t = template("web", Some(3), vec![var("ID", "###")]);
        let mut instances = expand(&t).unwrap();
        let snapshot = instances.clone();

        // Distinct backing storage for every env list.
        let template_env = t.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
            .env
            .as_ref()
            .unwrap()
            .as_ptr();
        let ptrs: Vec<_> = instances.iter().map(|d| env_of(d).as_ptr()).collect();
        assert!(ptrs.iter().all(|p| *p != template_env));
        assert_ne!(ptrs[0], ptrs[1]);
        assert_ne!(ptrs[1], ptrs[2]);

        // Mutate the first instance everywhere the engine writes.
        {
            let first = &mut instances[0];
            first
                .metadata
                .labels
                .as_mut()
                .unwrap()
                .insert("poisoned".to_string(), "yes".to_string());
            let spec = first.spec.as_mut().unwrap();
            spec.selector
                .match_labels
                .as_mut()
                .unwrap()
                .insert("poisoned".to_string(), "yes".to_string());
            spec.template
                .metadata
                .as_mut()
                .unwrap()
                .labels
                .as_mut()
                .unwrap()
                .insert("poisoned".to_string(), "yes".to_string());
            let pod = spec.template.spec.as_mut().unwrap();
            pod.containers[0].env.as_mut().unwrap().push(var("EXTRA", "1"));
            pod.containers[0].ports.as_mut().unwrap()[0].container_port = 1;
        }

        assert_eq!(instances[1], snapshot[1]);
        assert_eq!(instances[2], snapshot[2]);
        assert_eq!(t, template("web", Some(3), vec![var("ID", "###")]));
    }

    #[test]
    fn untouched_fields_are_carried_over() {
        let t = template("web", Some(2), vec![]);
        let source_pod = t.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        for instance in expand(&t).unwrap() {
            let pod = instance.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
            assert_eq!(pod.containers[0].ports, source_pod.containers[0].ports);
            assert_eq!(pod.containers[0].resources, source_pod.containers[0].resources);
            assert_eq!(pod.containers[0].image, source_pod.containers[0].image);
        }
    }

    #[test]
    fn expansion_is_deterministic() {
        let t = template("web", Some(5), vec![var("ID", "n###")]);
        assert_eq!(expand(&t).unwrap(), expand(&t).unwrap());
    }

    #[test]
    fn rejects_invalid_replica_counts() {
        assert_eq!(
            expand(&template("web", Some(0), vec![])),
            Err(ExpandError::InvalidReplicas(0))
        );
        assert_eq!(
            expand(&template("web", Some(-2), vec![])),
            Err(ExpandError::InvalidReplicas(-2))
        );
        assert_eq!(
            expand(&template("web", None, vec![])),
            Err(ExpandError::MissingReplicas)
        );
    }

    #[test]
    fn rejects_incomplete_templates() {
        let mut unnamed = template("web", Some(1), vec![]);
        unnamed.metadata.name = None;
        assert_eq!(expand(&unnamed), Err(ExpandError::MissingName));

        unnamed.metadata.name = Some(String::new());
        assert_eq!(expand(&unnamed), Err(ExpandError::MissingName));

        let mut no_spec = template("web", Some(1), vec![]);
        no_spec.spec = None;
        assert_eq!(expand(&no_spec), Err(ExpandError::MissingSpec));
    }

    #[test]
    fn rejects_empty_options() {
        let t = template("web", Some(1), vec![]);
        let expander = Expander::new(ExpandOptions {
            placeholder: String::new(),
            ..Default::default()
        });
        assert_eq!(expander.expand(&t), Err(ExpandError::EmptyPlaceholder));

        let expander = Expander::new(ExpandOptions {
            replica_label: String::new(),
            ..Default::default()
        });
        assert_eq!(expander.expand(&t), Err(ExpandError::EmptyLabelKey));
    }

    #[test]
    fn custom_options() {
        let config = FanoutConfig {
            expand: Some(ExpandConfig {
                placeholder: Some("%ID%".to_string()),
                replica_label: Some("shard".to_string()),
                separator: Some("-shard-".to_string()),
            }),
            ..Default::default()
        };
        let expander = Expander::new(ExpandOptions::from_config(&config));
        let t = template("kv", Some(2), vec![var("SHARD", "%ID%"), var("RAW", "###")]);

        let instances = expander.expand(&t).unwrap();
        assert_eq!(instances[1].metadata.name.as_deref(), Some("kv-shard-2"));
        assert_eq!(
            instances[1].metadata.labels.as_ref().unwrap().get("shard"),
            Some(&"2".to_string())
        );
        assert_eq!(env_value(&instances[1], "SHARD"), Some("2"));
        assert_eq!(env_value(&instances[1], "RAW"), Some("###"));
    }

    #[test]
    fn from_config_defaults() {
        assert_eq!(
            ExpandOptions::from_config(&FanoutConfig::default()),
            ExpandOptions::default()
        );
    }
}
