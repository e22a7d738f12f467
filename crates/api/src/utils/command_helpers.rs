//! Command execution helpers
//!
//! Every command body runs through [`execute_command`] so timing and outcome
//! logging stay uniform.

use std::future::Future;
use std::time::Instant;

use pocket_domain::{PocketError, Result as DomainResult, Session};

use crate::context::AppContext;
use crate::utils::logging::log_command_execution;

/// Time `command_fn`, log its outcome and pass the result through.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_tickets(ctx: &AppContext) -> DomainResult<Vec<SupportTicket>> {
///     execute_command("support::my_tickets", async {
///         let session = require_session(ctx).await?;
///         ctx.desk.tickets_for_user(&session.username).await
///     })
///     .await
/// }
/// ```
pub async fn execute_command<Fut, T>(command_name: &str, command_fn: Fut) -> DomainResult<T>
where
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = command_fn.await;
    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// The live session, or `Auth` when nobody is signed in (or it expired).
pub async fn require_session(ctx: &AppContext) -> DomainResult<Session> {
    ctx.session.current().await?.ok_or_else(|| PocketError::Auth("not signed in".into()))
}

/// The live session of an administrator.
pub async fn require_admin_session(ctx: &AppContext) -> DomainResult<Session> {
    let session = require_session(ctx).await?;
    ctx.accounts.require_admin(&session.username).await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_results_through_unchanged() {
        let ok = tokio_test::block_on(execute_command("test::ok", async { Ok(7) }));
        assert_eq!(ok.unwrap(), 7);

        let err: DomainResult<()> = tokio_test::block_on(execute_command("test::err", async {
            Err(PocketError::Conflict("stale version".into()))
        }));
        assert!(matches!(err, Err(PocketError::Conflict(_))));
    }
}
