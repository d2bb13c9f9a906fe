//! End-to-end pipeline against a live Postgres-compatible server.
//!
//! Run with:
//! `NECTAR_TEST_DATABASE_URL=postgresql://postgres@localhost/nectar cargo test -p nectar-etl -- --ignored`

use std::collections::BTreeMap;

use nectar_catalog::honeypot::{ATTACKS, CHANNELS};
use nectar_catalog::{TableSelector, honeypot_catalog};
use nectar_core::Session;
use nectar_etl::{DataQualityGate, EtlOrchestrator, LoadContext, Phase, PgSession, PipelineRun};

fn session() -> PgSession {
    let url = std::env::var("NECTAR_TEST_DATABASE_URL")
        .expect("NECTAR_TEST_DATABASE_URL must point at a scratch database");
    PgSession::connect(&url).expect("connect to test database")
}

fn no_loads() -> LoadContext {
    LoadContext {
        role_arn: String::new(),
        region: "us-west-2".to_string(),
        sources: BTreeMap::new(),
    }
}

const SEED_HONEYPOT: &str = "
INSERT INTO staging_honeypot
    (id, ident, normalized, timestamp, channel, attackerIP, attackerPort, victimIP, victimPort)
VALUES
    ('e1', 'sensor-a', true, '2019-03-01 10:00:00', 'glastopf.events',     '203.0.113.5',  4444, '0',        80),
    ('e2', 'sensor-a', true, '2019-03-01 10:01:00', 'amun.events',         '198.51.100.7', 1025, '10.0.0.2', 445),
    ('e3', 'sensor-b', true, '2019-03-01 10:02:00', 'dionaea.connections', '192.0.2.9',    5060, '10.0.0.3', 21),
    ('e4', 'sensor-b', true, '2019-03-01 10:03:00', 'snort.alerts',        '203.0.113.5',  NULL, '10.0.0.4', NULL);";

const SEED_IPGEO: &str = "
INSERT INTO staging_ipgeo
    (IP_orig, IP, country_code, country_name, region_name, city, time_zone, latitude, longitude)
VALUES
    ('203.0.113.5',  '203.0.113.5',  'NL', 'Netherlands',   'North Holland', 'Amsterdam', 'Europe/Amsterdam', 52.37, 4.89),
    ('198.51.100.7', '198.51.100.7', 'US', 'United States', 'Oregon',        'Portland',  'America/Los_Angeles', 45.52, -122.68),
    ('192.0.2.9',    '192.0.2.9',    'BR', 'Brazil',        'Sao Paulo',     'Sao Paulo', 'America/Sao_Paulo', -23.55, -46.63);";

const SEED_REPUTATION: &str = "
INSERT INTO staging_reputation
    (IP, Reliability, Risk, Type, Country, Locale, Latitude, Longitude)
VALUES
    ('198.51.100.7', 4, 2, 'Scanning Host', 'US', 'Portland', 45.52, -122.68);";

#[test]
#[ignore = "needs NECTAR_TEST_DATABASE_URL"]
fn full_pipeline_builds_star_schema() {
    let catalog = honeypot_catalog();
    let mut session = session();

    let mut run = PipelineRun::new(TableSelector::All);
    {
        let mut etl = EtlOrchestrator::new(&catalog, &mut session, no_loads());
        etl.drop_tables(&mut run).unwrap();
        etl.drop_tables(&mut run).unwrap();
        etl.create_tables(&mut run).unwrap();
    }

    for seed in [SEED_HONEYPOT, SEED_IPGEO, SEED_REPUTATION] {
        session.execute(seed).unwrap();
        session.commit().unwrap();
    }

    EtlOrchestrator::new(&catalog, &mut session, no_loads())
        .transform(&mut run)
        .unwrap();
    assert_eq!(run.succeeded(Phase::Transform).last(), Some(&ATTACKS));

    for (_, table) in CHANNELS {
        let rows = session
            .query_count(&format!("SELECT COUNT(*) FROM {table};"))
            .unwrap();
        assert_eq!(rows, 1, "{table}");
    }
    assert_eq!(session.query_count("SELECT COUNT(*) FROM attacks;").unwrap(), 4);

    let report = DataQualityGate::honeypot(&catalog).run(&mut session).unwrap();
    assert_eq!(report.covered_rows, 1);
    assert_eq!(report.fact_rows, 4);
}
