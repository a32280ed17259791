//! Canned incident scenarios and a demo roster.
//!
//! Each scenario builds a fresh `Incident` (new id, detected now) shaped like
//! an alert from a monitoring system.

use choreo_types::incident::{Category, Incident, Severity};
use choreo_types::team::TeamMember;
use serde_json::{json, Value};

/// Source system recorded on scenario incidents.
pub const SCENARIO_SOURCE: &str = "simulation";

/// Scenarios the `demo` command runs when none are named.
pub const DEMO_SEQUENCE: [&str; 3] = ["database_outage", "api_latency", "security_alert"];

/// A named, reproducible incident.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub category: Category,
    pub services: &'static [&'static str],
    pub tags: &'static [&'static str],
    metadata: fn() -> Value,
}

impl Scenario {
    /// Build a new incident for this scenario.
    pub fn incident(&self) -> Incident {
        let mut incident = Incident::new(self.title, self.description, self.severity)
            .with_category(self.category)
            .with_affected_services(self.services.iter().copied())
            .with_tags(self.tags.iter().copied())
            .with_source(
                SCENARIO_SOURCE,
                Some(format!(
                    "sim-{}-{}",
                    self.name,
                    chrono::Utc::now().format("%Y%m%d%H%M%S")
                )),
            );
        if let Value::Object(fields) = (self.metadata)() {
            incident.metadata.extend(fields);
        }
        incident
    }
}

pub const SCENARIOS: [Scenario; 6] = [
    Scenario {
        name: "database_outage",
        title: "Production Database Connection Failures",
        description: "Critical: PostgreSQL primary database showing connection pool exhaustion. \
                      Error rate at 45%. Multiple services reporting database timeouts.",
        severity: Severity::Critical,
        category: Category::Database,
        services: &["orders-api", "payments-api"],
        tags: &["database", "postgresql", "connection-pool", "production"],
        metadata: || {
            json!({
                "error_count": 1547,
                "affected_endpoints": ["/api/users", "/api/orders", "/api/payments"],
            })
        },
    },
    Scenario {
        name: "api_latency",
        title: "Payment API High Latency Detected",
        description: "Warning: Payment service response time increased to 5.2s (normal: 200ms). \
                      Downstream timeout errors observed.",
        severity: Severity::High,
        category: Category::Performance,
        services: &["payments-api"],
        tags: &["api", "payment", "latency", "performance"],
        metadata: || {
            json!({
                "p95_latency_ms": 5200,
                "p50_latency_ms": 3100,
                "baseline_latency_ms": 200,
                "affected_region": "us-east-1",
            })
        },
    },
    Scenario {
        name: "memory_leak",
        title: "Order Service Memory Leak",
        description: "Memory usage of order-service pods increasing steadily. \
                      Current usage at 89% of limit. OOM kill imminent.",
        severity: Severity::High,
        category: Category::Infrastructure,
        services: &["order-service"],
        tags: &["kubernetes", "memory", "order-service", "oom"],
        metadata: || {
            json!({
                "pod_name": "order-service-7d8f9b6c5-xk2lm",
                "memory_usage_percent": 89,
                "memory_limit": "2Gi",
            })
        },
    },
    Scenario {
        name: "security_alert",
        title: "Unusual Login Pattern Detected",
        description: "Security: Multiple failed login attempts from unusual IP ranges. \
                      Possible brute force attack on admin endpoints.",
        severity: Severity::Critical,
        category: Category::Security,
        services: &["auth-service"],
        tags: &["security", "authentication", "brute-force"],
        metadata: || {
            json!({
                "failed_attempts": 2341,
                "unique_ips": 47,
                "target_endpoint": "/admin/login",
            })
        },
    },
    Scenario {
        name: "deployment_failure",
        title: "Production Deployment Failed - Rollback Required",
        description: "Deployment of v2.4.0 to production failed. Health checks failing on 3/5 pods. \
                      Service degradation detected.",
        severity: Severity::High,
        category: Category::Application,
        services: &["storefront"],
        tags: &["deployment", "rollback", "health-check", "production"],
        metadata: || {
            json!({
                "deployment_version": "v2.4.0",
                "previous_version": "v2.3.9",
                "healthy_pods": 2,
                "unhealthy_pods": 3,
            })
        },
    },
    Scenario {
        name: "network_issue",
        title: "Inter-Service Communication Failures",
        description: "Network: High packet loss detected between services in kubernetes cluster. \
                      Service mesh reporting connection resets.",
        severity: Severity::Medium,
        category: Category::Network,
        services: &["user-service", "inventory-service"],
        tags: &["network", "kubernetes", "service-mesh", "packet-loss"],
        metadata: || json!({ "packet_loss_percent": 12, "cluster": "prod-us-east" }),
    },
];

/// Look up a scenario by name.
pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    SCENARIOS.iter().map(|s| s.name)
}

/// A small roster covering every category's skills, two of them on call.
pub fn demo_roster() -> Vec<TeamMember> {
    vec![
        TeamMember::new("u-ada", "Ada Park", "ada@example.com")
            .with_teams(["sre"])
            .with_skills(["kubernetes", "networking", "sre"])
            .with_chat_handle("U0ADA")
            .on_call(true),
        TeamMember::new("u-lin", "Lin Ortega", "lin@example.com")
            .with_teams(["data"])
            .with_skills(["postgresql", "database", "sql"])
            .with_chat_handle("U0LIN"),
        TeamMember::new("u-sam", "Sam Idowu", "sam@example.com")
            .with_teams(["security"])
            .with_skills(["security", "auth", "iam"])
            .with_chat_handle("U0SAM"),
        TeamMember::new("u-kim", "Kim Novak", "kim@example.com")
            .with_teams(["payments"])
            .with_skills(["backend", "python", "api"])
            .with_code_handle("knovak")
            .on_call(true),
        TeamMember::new("u-ravi", "Ravi Shah", "ravi@example.com")
            .with_teams(["platform"])
            .with_skills(["performance", "caching", "profiling"]),
        TeamMember::new("u-jo", "Jo Lindqvist", "jo@example.com")
            .with_teams(["frontend"])
            .with_skills(["react", "css"]),
    ]
}
