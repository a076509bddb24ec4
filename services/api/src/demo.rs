use crate::infra::{seed_accounts, LoggingNotifier, OutageStore, SeededAccount};
use chrono::{Local, NaiveDate};
use clap::Args;
use rentwise::access::{NewOccupant, User};
use rentwise::config::{LeasePolicy, SecurityConfig};
use rentwise::error::{AppError, LifecycleError};
use rentwise::occupancy::{
    parse_roster, NewProperty, NewUnit, OccupancyService, OccupancyTarget, Property, Unit,
};
use rentwise::store::{PropertyRepository, TenantRepository};
use rentwise::tenancy::{EmergencyContact, ProvisionTenantRequest, TenantProvisioningService};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

type DemoProvisioning = TenantProvisioningService<OutageStore, LoggingNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Unit roster CSV for the demo building. Defaults to two units at 15000/15000.
    #[arg(long)]
    pub(crate) units_csv: Option<PathBuf>,
    /// Lease start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) lease_start: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterCheckArgs {
    /// Roster file with headers unit_number,area,rent,deposit,bedrooms
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_roster_check(args: RosterCheckArgs) -> Result<(), AppError> {
    let units = parse_roster(File::open(&args.csv)?)?;

    println!("Roster {} is valid: {} units", args.csv.display(), units.len());
    for unit in &units {
        let bedrooms = unit
            .bedrooms
            .map(|count| format!(" | {count} bd"))
            .unwrap_or_default();
        println!(
            "- {} | {:.2} m2 | rent {} | deposit {}{}",
            unit.unit_number, unit.area, unit.rent, unit.deposit, bedrooms
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let roster = match &args.units_csv {
        Some(path) => parse_roster(File::open(path)?)?,
        None => default_roster(),
    };
    let lease_start = args
        .lease_start
        .unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(OutageStore::default());
    let occupancy = Arc::new(OccupancyService::new(store.clone(), LeasePolicy::default()));
    let provisioning = TenantProvisioningService::new(
        occupancy.clone(),
        Arc::new(LoggingNotifier),
        &SecurityConfig::default(),
    );
    let accounts = seed_accounts(store.as_ref()).map_err(LifecycleError::from)?;
    let agent = account(&accounts, "agent")?;
    let clerk = account(&accounts, "employee")?;

    println!("Occupancy lifecycle demo (lease start {lease_start})");
    let building = occupancy.create_property(
        agent,
        NewProperty {
            title: "Harbor Flats".to_string(),
            address: "90 Harbor Way".to_string(),
            has_units: true,
            rent: None,
            deposit: None,
            agent: None,
        },
    )?;
    let units = occupancy.add_units(agent, &building.id, roster)?;
    println!(
        "Listed {} ({}) with {} units",
        building.title,
        building.id,
        units.len()
    );

    println!("\nScenario A: employee without canCreateTenants provisions a tenant");
    let first = &units[0];
    match provisioning.provision(
        clerk,
        demo_request(&building, first, "alex@example.com", lease_start),
    ) {
        Ok(outcome) => println!("  Unexpectedly provisioned {}", outcome.tenant.id),
        Err(err) => println!("  Rejected: {err}"),
    }
    let bound = store
        .active_tenant_for(&unit_target(&building, first))
        .map_err(LifecycleError::from)?;
    println!(
        "  Active tenant on {}: {}",
        first.unit_number,
        bound.map_or_else(|| "none".to_string(), |tenant| tenant.id.to_string())
    );

    println!("\nScenario B: agent provisions unit {}", first.unit_number);
    let outcome = provisioning.provision(
        agent,
        demo_request(&building, first, "jordan@example.com", lease_start),
    )?;
    println!(
        "  Tenant {} | rent {} | deposit {} | lease {} -> {}",
        outcome.tenant.id,
        outcome.tenant.lease.rent_amount,
        outcome.tenant.lease.deposit_amount,
        outcome.tenant.lease.lease_start_date,
        outcome.tenant.lease.lease_end_date
    );
    if let Some(credential) = &outcome.credential {
        println!(
            "  Temporary credential issued for {} (must change password: {})",
            credential.email, credential.must_change_password
        );
    }
    println!(
        "  Unit {} is now {} | warnings: {}",
        first.unit_number,
        availability_of(store.as_ref(), &building, first)?,
        outcome.warnings.len()
    );

    match units.get(1) {
        Some(second) => scenario_partial_failure(
            &provisioning,
            store.as_ref(),
            agent,
            &building,
            second,
            lease_start,
        )?,
        None => println!("\nScenario C skipped: the roster needs a second unit"),
    }

    println!("\nScenario D: enabling unit mode twice on a single-family listing");
    let cottage = occupancy.create_property(
        agent,
        NewProperty {
            title: "Linden Cottage".to_string(),
            address: "200 Linden Ave".to_string(),
            has_units: false,
            rent: Some(2000),
            deposit: Some(2000),
            agent: None,
        },
    )?;
    for attempt in 1..=2 {
        let property = occupancy.enable_units(agent, &cottage.id)?;
        println!("  Attempt {attempt}: hasUnits = {}", property.has_units);
    }

    Ok(())
}

fn scenario_partial_failure(
    provisioning: &DemoProvisioning,
    store: &OutageStore,
    agent: &User,
    building: &Property,
    unit: &Unit,
    lease_start: NaiveDate,
) -> Result<(), AppError> {
    println!(
        "\nScenario C: provisioning unit {} while availability writes are offline",
        unit.unit_number
    );
    store.set_outage(true);
    let outcome = provisioning.provision(
        agent,
        demo_request(building, unit, "riley@example.com", lease_start),
    );
    store.set_outage(false);
    let outcome = outcome?;

    println!("  Tenant {} created", outcome.tenant.id);
    for warning in &outcome.warnings {
        println!("  Warning: {warning}");
    }
    println!(
        "  Unit {} remains {}",
        unit.unit_number,
        availability_of(store, building, unit)?
    );

    let state = provisioning.retry_occupancy(agent, &outcome.tenant.id)?;
    println!("  Retry after recovery: unit is {}", state.availability);
    Ok(())
}

fn account<'a>(accounts: &'a [SeededAccount], role: &str) -> Result<&'a User, AppError> {
    accounts
        .iter()
        .find(|account| account.role_label() == role)
        .map(|account| &account.user)
        .ok_or_else(|| {
            AppError::Lifecycle(LifecycleError::Internal(format!(
                "no seeded {role} account"
            )))
        })
}

fn default_roster() -> Vec<NewUnit> {
    ["A-101", "A-102"]
        .into_iter()
        .map(|number| NewUnit {
            unit_number: number.to_string(),
            area: 52.0,
            rent: 15000,
            deposit: 15000,
            bedrooms: Some(2),
        })
        .collect()
}

fn unit_target(building: &Property, unit: &Unit) -> OccupancyTarget {
    OccupancyTarget::unit(building.id.clone(), unit.id.clone())
}

fn availability_of(
    store: &OutageStore,
    building: &Property,
    unit: &Unit,
) -> Result<String, AppError> {
    let state = store
        .fetch_target(&unit_target(building, unit))
        .map_err(LifecycleError::from)?;
    Ok(state.map_or_else(
        || "missing".to_string(),
        |state| state.availability.to_string(),
    ))
}

/// Twelve month lease on `unit`; rent and deposit follow the unit listing.
fn demo_request(
    building: &Property,
    unit: &Unit,
    email: &str,
    lease_start: NaiveDate,
) -> ProvisionTenantRequest {
    ProvisionTenantRequest {
        property: building.id.clone(),
        unit: Some(unit.id.clone()),
        user_id: None,
        user_data: Some(NewOccupant {
            name: "Demo Occupant".to_string(),
            email: email.to_string(),
            phone: None,
        }),
        move_in_date: None,
        lease_start_date: lease_start,
        lease_end_date: None,
        lease_duration_months: Some(12),
        rent_amount: None,
        deposit_amount: None,
        emergency_contact: EmergencyContact {
            name: "Casey Reyes".to_string(),
            phone: "555-0143".to_string(),
            relationship: Some("sibling".to_string()),
        },
        employment: None,
        references: Vec::new(),
    }
}
