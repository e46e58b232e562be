use crate::context::{user_facing, AppContext};
use crate::output::Output;
use color_eyre::Result;
use qd_core::{sweep, Finding};

fn describe(finding: &Finding) -> String {
    match finding {
        Finding::MissingUserLink { user, group } => {
            format!("{} is in the members of {} but does not list the group", user, group)
        }
        Finding::MissingMember { user, group } => format!("{} lists {} but is not one of its members", user, group),
        Finding::DanglingGroup { user, group } => format!("{} lists {}, which does not exist", user, group),
        Finding::UnknownMember { user, group } => format!("{} has member {}, who has no account", group, user),
    }
}

pub async fn run_doctor(repair: bool, ctx: AppContext, output: &Output) -> Result<()> {
    let report = sweep(&*ctx.store, repair).await.map_err(user_facing)?;

    output.emit(&report, || {
        output.info(format!(
            "Checked {} user(s) and {} group(s)",
            report.users_checked, report.groups_checked
        ));
        if report.is_consistent() {
            output.success("Memberships are consistent");
            return;
        }
        for finding in &report.findings {
            output.warn(describe(finding));
        }
        if repair {
            output.success(format!("Repaired {} link(s)", report.repaired));
        } else if report.findings.iter().any(Finding::is_repairable) {
            output.info("Run 'qd doctor --repair' to fix missing links");
        }
    });
    Ok(())
}
