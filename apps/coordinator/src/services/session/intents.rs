use tracing::{error, info};

use super::SessionCoordinator;
use crate::domain::player::Guess;
use crate::error::AppError;
use crate::ws::hub::ConnId;
use crate::ws::protocol::ClientMsg;

impl SessionCoordinator {
    /// Entry point for every client intent. Failures are reported back to the
    /// sender as a `failure` event and never escape.
    pub async fn handle_intent(&self, conn_id: ConnId, msg: ClientMsg) {
        let kind = msg.kind();
        if let Err(err) = self.dispatch(conn_id, msg).await {
            if err.is_client_error() {
                info!(
                    conn_id = %conn_id,
                    intent = kind,
                    code = %err.code(),
                    error = %err,
                    "[COORDINATOR] intent rejected"
                );
            } else {
                error!(
                    conn_id = %conn_id,
                    intent = kind,
                    code = %err.code(),
                    error = %err,
                    "[COORDINATOR] intent failed"
                );
            }
            self.report_failure(conn_id, &err).await;
        }
    }

    async fn dispatch(&self, conn_id: ConnId, msg: ClientMsg) -> Result<(), AppError> {
        match msg {
            // Answered by the transport layer.
            ClientMsg::Hello { .. } => Ok(()),
            ClientMsg::Login { username, password } => {
                self.login(conn_id, &username, &password).await
            }
            ClientMsg::Register { username, password } => {
                self.register(conn_id, &username, &password).await
            }
            ClientMsg::CreateLobby => self.create_lobby(conn_id).await,
            ClientMsg::JoinLobby { code } => self.join_lobby(conn_id, code).await,
            ClientMsg::ReturnToMenu => self.return_to_menu(conn_id).await,
            ClientMsg::EnterUpload => self.enter_upload(conn_id).await,
            ClientMsg::SubmitUpload { metadata, image } => {
                self.submit_upload(conn_id, metadata, &image).await
            }
            ClientMsg::RequestLeaderboard { scope, limit } => {
                self.request_leaderboard(conn_id, scope, limit).await
            }
            ClientMsg::SubmitGuess { lat, lon } => {
                self.submit_guess(conn_id, Guess { lat, lon }).await
            }
            ClientMsg::Advance => self.advance(conn_id).await,
        }
    }
}
