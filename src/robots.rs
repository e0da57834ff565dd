//! Robots-exclusion policy: enough of robots.txt to honor Allow/Disallow
//! per user-agent. An empty or absent file allows everything.

use std::collections::HashMap;

/// Allow/disallow path prefixes for one user-agent group.
#[derive(Debug, Clone, Default)]
struct PathRules {
    disallow: Vec<String>,
    allow: Vec<String>,
}

impl PathRules {
    fn permits(&self, path: &str) -> bool {
        // Allow entries take precedence over Disallow.
        if self.allow.iter().any(|prefix| path.starts_with(prefix)) {
            return true;
        }
        for prefix in &self.disallow {
            if prefix == "/" || path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Parsed robots.txt rules, keyed by lowercased user-agent token.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    agents: HashMap<String, PathRules>,
    wildcard: PathRules,
}

impl RobotsPolicy {
    pub fn parse(content: &str) -> Self {
        let mut policy = Self::default();
        let mut group_agents: Vec<String> = Vec::new();
        let mut group_rules = PathRules::default();
        let mut group_has_rules = false;

        let mut flush = |agents: &mut Vec<String>, rules: &mut PathRules, policy: &mut Self| {
            for agent in agents.drain(..) {
                if agent == "*" {
                    policy.wildcard = rules.clone();
                } else {
                    policy.agents.insert(agent, rules.clone());
                }
            }
            *rules = PathRules::default();
        };

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match directive.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share the rules that follow.
                    if group_has_rules {
                        flush(&mut group_agents, &mut group_rules, &mut policy);
                        group_has_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    group_has_rules = true;
                    if !value.is_empty() {
                        group_rules.disallow.push(value.to_string());
                    }
                }
                "allow" => {
                    group_has_rules = true;
                    if !value.is_empty() {
                        group_rules.allow.push(value.to_string());
                    }
                }
                _ => {}
            }
        }
        flush(&mut group_agents, &mut group_rules, &mut policy);

        policy
    }

    /// Whether `path` may be fetched by `user_agent`. Agent tokens match by
    /// substring against the request agent, falling back to the `*` group.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent_lower = user_agent.to_lowercase();
        let rules = self
            .agents
            .get(&agent_lower)
            .or_else(|| {
                self.agents
                    .iter()
                    .find(|(token, _)| agent_lower.contains(token.as_str()))
                    .map(|(_, rules)| rules)
            })
            .unwrap_or(&self.wildcard);
        rules.permits(path)
    }
}
