// Example: Failure Artifact Demo
//
// Runs a scenario that fails against a scripted peer and a stand-in gateway
// process, then saves, reloads and prints the failure artifact.
//
// Unix only: the stand-in gateway is a shell loop that exits on SIGINT.

use anyhow::Result;
use gateway_testing_framework::prelude::*;
use gateway_testing_framework::process::ProcessRunner;
use gateway_testing_framework::utilities::{
    load_artifact, print_artifact_summary, validate_artifact, ArtifactCollector,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║               Failure Artifact Demo                            ║");
    println!("╚════════════════════════════════════════════════════════════════╝\n");

    let output_dir = std::env::temp_dir().join("gateway_artifact_demo");
    std::fs::create_dir_all(&output_dir)?;

    println!("1. Starting the stand-in gateway...");
    let mut gateway = ProcessRunner::new(
        "fake-biboumi",
        "sh",
        vec![
            "-c".to_string(),
            "trap 'exit 0' INT; while :; do sleep 0.1; done".to_string(),
        ],
        output_dir.join("fake_biboumi_output.txt"),
    );
    gateway.start().await?;

    println!("2. Scripting the gateway's side of the session...");
    let (mut peer, script) = MemoryPeer::pair();
    script.stanza("<handshake xmlns='jabber:component:accept'>secret</handshake>");
    script.stanza(
        "<message from='#foo%irc.localhost@biboumi.localhost/Nick' to='first@example.com/resource1' \
         type='groupchat'><subject/></message>",
    );

    let scenario = Scenario::new(
        "demo_subject",
        steps![
            handshake_sequence(),
            Step::expect(["/message[@type='groupchat']/subject[text()='Welcome']"]),
        ],
    );

    println!("3. Running the scenario...");
    let (_cancel_tx, mut cancel) = watch::channel(false);
    let outcome = run_session(
        scenario.stepper(Arc::new(SxdEvaluator), Fixtures::default()),
        &mut peer,
        &mut gateway,
        &SystemClock,
        &mut cancel,
        &SessionSettings::default(),
    )
    .await;
    println!(
        "   passed: {}, gateway exit code: {:?}\n",
        outcome.passed(),
        outcome.exit_code
    );

    println!("4. Saving the failure artifact...");
    let mut collector = ArtifactCollector::new(&scenario.name);
    collector.set_config_variant(scenario.config);
    collector.set_expected_exit_code(scenario.expected_exit_code);
    collector.record_outcome(&outcome);
    let path = collector.save(&output_dir).await?;
    println!("   saved to {}\n", path.display());

    println!("5. Reloading it for inspection...\n");
    let artifact = load_artifact(&path).await?;
    print_artifact_summary(&artifact);
    validate_artifact(&artifact)?;

    println!("\nArtifact is consistent.");
    Ok(())
}
