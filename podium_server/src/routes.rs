//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! Handlers are generic over the storage and ledger traits so that the endpoint tests can swap in
//! doubles. Actix cannot register generic handlers directly, so registration goes through the
//! `route!` macro, which generates a named `HttpServiceFactory` per route and optionally wraps it
//! in the role ACL middleware.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use podium_engine::{
    db_types::{NewJudgeAssignment, Role},
    winners::WinnerPick,
    CompetitionApi,
    JudgingApi,
    MoneyLedger,
    ScoreSubmission,
    SettlementApi,
    SettlementDatabase,
};

use crate::{
    auth::AuthClaims,
    data_objects::{BulkJudgeAssignmentRequest, JudgeScoreSubmit, SelectWinnersRequest, TransitionRequest},
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so registration is implemented manually using the
// `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//--------------------------------------------   Lifecycle  ----------------------------------------------------
route!(transition_status => Post "/competitions/{id}/status" impl SettlementDatabase where requires [Role::Admin]);
/// Requests a competition lifecycle transition.
///
/// The forward chain Draft → Upcoming → Active → Closed → Judging → Complete is enforced by the
/// CRUD layer; this endpoint adds the structural guard on entering Complete (winners selected and
/// matching the prize structure) and fires the announcement hook on Draft → Upcoming.
pub async fn transition_status<B: SettlementDatabase>(
    path: web::Path<i64>,
    body: web::Json<TransitionRequest>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    let new_status = body.into_inner().status;
    debug!("💻️ POST transition competition {competition_id} to {new_status}");
    let competition = api.transition_status(competition_id, new_status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "competition_id": competition.id,
        "status": competition.status,
    })))
}

route!(delete_competition => Delete "/competitions/{id}" impl SettlementDatabase where requires [Role::Admin]);
/// Deletes a competition. Only legal while the competition is still in Draft; the cascade removes
/// its submissions and payments.
pub async fn delete_competition<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    debug!("💻️ DELETE competition {competition_id}");
    api.delete_competition(competition_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Competition deleted successfully" })))
}

//--------------------------------------------   Judging  ------------------------------------------------------
route!(assign_judges => Post "/competitions/{id}/assign-judges" impl SettlementDatabase where requires [Role::Admin]);
/// Assigns judges to submissions. The competition must be Closed or Judging; submissions must be
/// judgeable. Existing (judge, submission) pairs are skipped, so the request is idempotent.
/// Returns all assignments for the competition.
pub async fn assign_judges<B: SettlementDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<BulkJudgeAssignmentRequest>,
    api: web::Data<JudgingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ POST assign judges for competition {competition_id}");
    let assignments: Vec<NewJudgeAssignment> = request
        .assignments
        .iter()
        .flat_map(|entry| {
            entry
                .submission_ids
                .iter()
                .map(|&sid| NewJudgeAssignment::new(entry.judge_id, sid, claims.user_id))
        })
        .collect();
    let all = api.assign_judges(competition_id, assignments).await?;
    Ok(HttpResponse::Ok().json(all))
}

route!(submit_score => Post "/submissions/{id}/score" impl SettlementDatabase where requires [Role::Judge, Role::Admin]);
/// Records a judge's rubric scores for a submission.
///
/// The criterion key set must match the competition rubric exactly and every score must lie in
/// [0, 10]; violations come back as structured 400s listing the offending keys. Judges must hold
/// an assignment for the submission; admins bypass that check without completing any assignment.
pub async fn submit_score<B: SettlementDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<JudgeScoreSubmit>,
    api: web::Data<JudgingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let submission_id = path.into_inner();
    let payload = body.into_inner();
    debug!("💻️ POST score for submission {submission_id} from judge {}", claims.user_id);
    let submission = api
        .submit_score(ScoreSubmission {
            submission_id,
            judge_id: claims.user_id,
            judge_name: claims.display_name(),
            criteria_scores: payload.criteria_scores,
            feedback: payload.feedback,
            privileged: claims.is_privileged(),
        })
        .await?;
    let view = podium_engine::objects::ScoredSubmission::from_submission(&submission, Some(claims.user_id));
    Ok(HttpResponse::Ok().json(view))
}

route!(leaderboard => Get "/competitions/{id}/leaderboard" impl SettlementDatabase where requires [Role::Admin]);
/// The operational leaderboard: every eligible submission ranked, with judging progress and full
/// identities. Available in any competition state.
pub async fn leaderboard<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<JudgingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    debug!("💻️ GET leaderboard for competition {competition_id}");
    let board = api.leaderboard(competition_id).await?;
    Ok(HttpResponse::Ok().json(board))
}

route!(results => Get "/competitions/{id}/results" impl SettlementDatabase);
/// The public results view. Only available once the competition is Complete; identifying fields
/// of non-public submissions are redacted. Requires authentication but no particular role.
pub async fn results<B: SettlementDatabase>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<JudgingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    debug!("💻️ GET results for competition {competition_id} (user {})", claims.user_id);
    let board = api.results(competition_id).await?;
    Ok(HttpResponse::Ok().json(board))
}

//--------------------------------------------   Winners  ------------------------------------------------------
route!(select_winners => Post "/competitions/{id}/select-winners" impl SettlementDatabase where requires [Role::Admin]);
/// Commits a winner selection. All seven structural preconditions (Judging status, complete
/// judging, counts, duplicates, place set, eligibility) are validated before anything is written;
/// the commit itself is atomic and the competition stays in Judging.
pub async fn select_winners<B: SettlementDatabase>(
    path: web::Path<i64>,
    body: web::Json<SelectWinnersRequest>,
    api: web::Data<CompetitionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let competition_id = path.into_inner();
    let picks: Vec<WinnerPick> = body.into_inner().winners;
    debug!("💻️ POST select {} winners for competition {competition_id}", picks.len());
    let outcome = api.select_winners(competition_id, picks).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//--------------------------------------------   Settlement  ---------------------------------------------------
route!(entry_charge => Post "/submissions/{id}/entry-charge" impl SettlementDatabase, MoneyLedger);
/// Creates (or surfaces) the entry-fee charge for the caller's submission. Returns the charge's
/// client-completion token, or reports that the fee has already settled.
pub async fn entry_charge<B, L>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    let submission_id = path.into_inner();
    debug!("💻️ POST entry charge for submission {submission_id} by user {}", claims.user_id);
    let outcome = api.request_entry_charge(submission_id, claims.user_id, claims.is_privileged()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(check_payment => Post "/submissions/{id}/check-payment" impl SettlementDatabase, MoneyLedger);
/// Client-initiated reconciliation: asks the processor for the charge's live status and applies
/// the same (idempotent) success effects the webhook would have. This is the recovery path for
/// lost or swallowed webhook deliveries.
pub async fn check_payment<B, L>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    let submission_id = path.into_inner();
    debug!("💻️ POST check payment for submission {submission_id} by user {}", claims.user_id);
    let outcome = api.poll_entry_payment(submission_id, claims.user_id, claims.is_privileged()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(distribute_prizes => Post "/competitions/{id}/distribute-prizes" impl SettlementDatabase, MoneyLedger where requires [Role::Admin]);
/// Runs the prize-payout batch for a completed competition. Safe to re-run: transfers carry
/// deterministic idempotency keys and already-initiated payouts are reported, not repeated.
pub async fn distribute_prizes<B, L>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    let competition_id = path.into_inner();
    debug!("💻️ POST distribute prizes for competition {competition_id}");
    let result = api.distribute_prizes(competition_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(competition_payouts => Get "/competitions/{id}/payouts" impl SettlementDatabase, MoneyLedger where requires [Role::Admin]);
/// The prize-payout audit trail for a competition.
pub async fn competition_payouts<B, L>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    let competition_id = path.into_inner();
    debug!("💻️ GET payouts for competition {competition_id}");
    let payouts = api.payout_history(competition_id).await?;
    Ok(HttpResponse::Ok().json(payouts))
}

route!(my_winnings => Get "/my-winnings" impl SettlementDatabase, MoneyLedger);
/// The caller's prize payouts across all competitions.
pub async fn my_winnings<B, L>(
    claims: AuthClaims,
    api: web::Data<SettlementApi<B, L>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    L: MoneyLedger,
{
    debug!("💻️ GET my winnings for user {}", claims.user_id);
    let winnings = api.winnings_for_user(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(winnings))
}
