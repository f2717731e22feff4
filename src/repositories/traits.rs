//! Trait CRUD comuni ai repository
//!
//! Ogni repository implementa solo quelli che gli servono: ad esempio i profili sono
//! creati da Supabase Auth e quindi `ProfileRepository` espone solo `Read`.

/// Inserimento di una nuova riga, restituita così come salvata (`RETURNING *`)
pub trait Create<Entity, CreateDTO> {
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Lettura per chiave primaria; `Ok(None)` se la riga non esiste
pub trait Read<Entity, Id> {
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Aggiornamento parziale di una riga esistente.
/// Se l'id non esiste l'errore è `sqlx::Error::RowNotFound` (mappato a 404).
pub trait Update<Entity, UpdateDTO, Id> {
    async fn update(&self, id: &Id, data: &UpdateDTO) -> Result<Entity, sqlx::Error>;
}

/// Cancellazione per chiave primaria; `Ok(false)` se nessuna riga corrispondeva.
/// Le righe figlie (parametri, spiegazioni, chat, sintesi) seguono per `ON DELETE CASCADE`.
pub trait Delete<Id> {
    async fn delete(&self, id: &Id) -> Result<bool, sqlx::Error>;
}
