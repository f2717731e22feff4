//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Questo modulo organizza i repository in sotto-moduli separati per una migliore manutenibilità.
//! Ogni repository gestisce le operazioni di database per una specifica entità.

// ************************* NOTA SULLE QUERY ************************* //

/*
   Le query usano l'API runtime di sqlx (`sqlx::query_as::<_, T>` + `.bind(..)`) e non le macro
   `query!`/`query_as!`: le macro verificano lo schema a compile time e quindi richiedono un
   Postgres raggiungibile (o la cache offline di `cargo sqlx prepare`) anche solo per compilare.
   Il mapping riga -> struct è fatto da `#[derive(sqlx::FromRow)]` sulle entity, gli enum Postgres
   da `#[derive(sqlx::Type)]` (vedi `entities::enums`).

   Promemoria sui metodi di fetch:
   Number of Rows   Method to Call                Returns
   None             .execute(...).await           sqlx::Result<PgQueryResult>   (INSERT/UPDATE/DELETE senza RETURNING)
   Zero or One      .fetch_optional(...).await    sqlx::Result<Option<T>>
   Exactly One      .fetch_one(...).await         sqlx::Result<T>               (errore RowNotFound se vuoto; aggregate)
   Multiple         .fetch_all(...).await         sqlx::Result<Vec<T>>

   Per i filtri dinamici si usa `sqlx::QueryBuilder`, mai la concatenazione di stringhe con input utente.
*/

// ************************* MODULI REPOSITORY ************************* //

pub mod chat_message;
pub mod explanation;
pub mod family_connection;
pub mod parameter;
pub mod profile;
pub mod report;
pub mod subscription;
pub mod synthesis;
pub mod traits;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, Update};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use chat_message::ChatMessageRepository;
pub use explanation::ExplanationRepository;
pub use family_connection::FamilyConnectionRepository;
pub use parameter::ParameterRepository;
pub use profile::ProfileRepository;
pub use report::{ReportFilter, ReportRepository};
pub use subscription::SubscriptionRepository;
pub use synthesis::SynthesisRepository;
