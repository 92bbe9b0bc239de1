use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Feature {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LandingView {
    pub product: &'static str,
    pub headline: &'static str,
    pub tagline: &'static str,
    pub features: Vec<Feature>,
    pub navigation: Vec<NavLink>,
}

const FEATURES: [(&str, &str, &str); 4] = [
    (
        "github",
        "GitHub Integration",
        "Seamlessly analyze smart contracts directly from GitHub repositories",
    ),
    (
        "analysis",
        "Advanced Analysis",
        "Advanced machine learning algorithms detect complex vulnerabilities",
    ),
    (
        "reports",
        "Professional Reports",
        "Generate comprehensive bug bounty reports with proof-of-concept exploits",
    ),
    (
        "realtime",
        "Real-time Processing",
        "Fast analysis with live progress tracking and instant results",
    ),
];

pub async fn landing_page() -> Json<LandingView> {
    Json(LandingView {
        product: "SMCVD",
        headline: "Smart Contract Vulnerability Detection",
        tagline: "Discover security vulnerabilities in smart contracts and generate \
                  professional bug bounty reports in minutes.",
        features: FEATURES
            .iter()
            .map(|&(id, title, description)| Feature {
                id,
                title,
                description,
            })
            .collect(),
        navigation: vec![NavLink {
            label: "Start Analysis",
            href: "/analyze",
        }],
    })
}
