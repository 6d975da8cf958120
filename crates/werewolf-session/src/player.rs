//! The server-side view of one seated player.
//!
//! A [`PlayerSession`] pairs game state (seat, role, alive, police badge,
//! skill counter) with the [`Peer`] used to reach the client. Every
//! request method builds a packet with the peer's endpoint pair, asks,
//! and maps "no usable answer" to `None`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use werewolf_protocol::{Packet, PacketKind, Seat};

use crate::{DeathCause, Peer, RoleKind, SessionError, SkillContext};

/// A player's answer to a night skill prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReply {
    pub action: bool,
    pub target: i64,
}

/// What a dying player left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathReport {
    /// Where the police badge should go, if the player held it.
    pub successor: Option<Seat>,
    /// The player's last speech, if they were given the floor.
    pub final_words: Option<String>,
}

/// One seated player.
#[derive(Debug)]
pub struct PlayerSession {
    seat: Seat,
    role: RoleKind,
    alive: bool,
    police: bool,
    used: u32,
    peer: Arc<Peer>,
    pack: Vec<Arc<Peer>>,
}

impl PlayerSession {
    pub fn new(seat: Seat, role: RoleKind, peer: Arc<Peer>) -> Self {
        Self {
            seat,
            role,
            alive: true,
            police: false,
            used: 0,
            peer,
            pack: Vec::new(),
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn role(&self) -> RoleKind {
        self.role
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_police(&self) -> bool {
        self.police
    }

    /// The role's skill counter.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// A burned Idiot keeps playing but loses the right to vote.
    pub fn can_vote(&self) -> bool {
        !(self.role == RoleKind::Idiot && self.used > 0)
    }

    pub fn set_police(&mut self, police: bool) {
        self.police = police;
    }

    /// ORs `bits` into the skill counter.
    pub fn record_skill(&mut self, bits: u32) {
        self.used |= bits;
    }

    /// Replaces the sibling wolves this player relays chat to.
    pub fn set_pack(&mut self, pack: Vec<Arc<Peer>>) {
        self.pack = pack;
    }

    /// Stops relaying chat to the given connection.
    pub fn remove_from_pack(&mut self, peer: &Arc<Peer>) {
        self.pack.retain(|p| p.id() != peer.id());
    }

    pub fn pack_len(&self) -> usize {
        self.pack.len()
    }

    // -----------------------------------------------------------------------
    // Notifications (fire-and-forget)
    // -----------------------------------------------------------------------

    /// Sends a plain announcement.
    pub fn inform(&self, content: &str) {
        self.notify(
            self.peer
                .packet(PacketKind::Announcement)
                .field("content", content)
                .build(),
        );
    }

    pub fn inform_death(&self) {
        self.notify(self.peer.packet(PacketKind::DeathNotice).build());
    }

    pub fn inform_result(&self, won: bool) {
        self.notify(
            self.peer
                .packet(PacketKind::GameResult)
                .field("result", won)
                .build(),
        );
    }

    /// Tells the client its seat and identity code.
    pub fn inform_identity(&self) {
        self.notify(
            self.peer
                .packet(PacketKind::EstablishResponse)
                .field("seat", self.seat)
                .field("identity", self.role.identity())
                .build(),
        );
    }

    pub fn inform_self_destruct(&self, seat: Seat) {
        self.notify(
            self.peer
                .packet(PacketKind::SelfDestruct)
                .field("id", seat)
                .build(),
        );
    }

    /// Tells the predictor what an inspection found: an action response
    /// whose `action` is `true` for the wolf family, plus a readable line.
    pub fn reveal(&self, seat: Seat, is_wolf: bool) {
        self.notify(
            self.peer
                .packet(PacketKind::ActionResponse)
                .field("action", is_wolf)
                .field("target", seat)
                .build(),
        );
        let side = if is_wolf { "a werewolf" } else { "on the village side" };
        self.inform(&format!("Seat {} is {side}.", seat.0));
    }

    /// Forwards a chat line as free discussion.
    pub fn relay(&self, content: &str) {
        self.notify(
            self.peer
                .packet(PacketKind::FreeDiscussion)
                .field("content", content)
                .build(),
        );
    }

    fn notify(&self, packet: Result<Packet, werewolf_protocol::ProtocolError>) {
        let result = packet
            .map_err(SessionError::from)
            .and_then(|p| self.peer.send(&p));
        if let Err(e) = result {
            tracing::debug!(seat = %self.seat, error = %e, "notification dropped");
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    fn action_prompt(
        &self,
        iskill: bool,
        format: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Option<Packet> {
        self.peer
            .packet(PacketKind::ActionPrompt)
            .field("iskill", iskill)
            .field("format", format)
            .field("prompt", prompt)
            .field("timeLimit", timeout.as_secs_f64())
            .build()
            .inspect_err(|e| tracing::warn!(seat = %self.seat, error = %e, "bad prompt"))
            .ok()
    }

    async fn ask_action(
        &self,
        iskill: bool,
        format: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Option<ActionReply> {
        let request = self.action_prompt(iskill, format, prompt, timeout)?;
        let reply = self.peer.ask(request, timeout).await?;
        Some(ActionReply {
            action: reply.bool("action")?,
            target: reply.int("target")?,
        })
    }

    /// Asks whether the player runs for police. Silence means no.
    pub async fn join_election(&self, timeout: Duration) -> bool {
        self.ask_action(
            false,
            "bool",
            "Do you want to run for police? Reply true to run.",
            timeout,
        )
        .await
        .is_some_and(|reply| reply.action)
    }

    /// Asks the police which way the discussion goes. `true` = clockwise.
    pub async fn choose_direction(&self, timeout: Duration) -> Option<bool> {
        self.ask_action(
            false,
            "bool",
            "Which way should the discussion go? Reply true for clockwise.",
            timeout,
        )
        .await
        .map(|reply| reply.action)
    }

    /// Asks for a ballot. Abstentions and non-positive candidates are `None`.
    pub async fn vote(&self, prompt: &str, timeout: Duration) -> Option<Seat> {
        let request = self
            .peer
            .packet(PacketKind::VotePrompt)
            .field("prompt", prompt)
            .build()
            .ok()?;
        let reply = self.peer.ask(request, timeout).await?;
        if reply.bool("vote") != Some(true) {
            return None;
        }
        Seat::from_wire(reply.int("candidate")?)
    }

    /// Gives the player the floor for `timeout`.
    pub async fn speak(&self, timeout: Duration) -> Option<String> {
        let request = self
            .peer
            .packet(PacketKind::TimedDiscussionPrompt)
            .field("timeLimit", whole_seconds(timeout))
            .build()
            .ok()?;
        let reply = self.peer.ask(request, timeout).await?;
        reply.str("content").map(str::to_string)
    }

    /// Runs the role's night skill, if it has one left.
    pub async fn skill(&self, ctx: &SkillContext, timeout: Duration) -> Option<ActionReply> {
        let prompt = self.role.strategy().skill_prompt(self.used, ctx)?;
        self.ask_action(true, "int", &prompt, timeout).await
    }

    /// Asks for one seat with a free-form prompt (hunter shot, white
    /// werewolf explosion).
    pub async fn pick_seat(&self, prompt: &str, timeout: Duration) -> Option<Seat> {
        let reply = self.ask_action(true, "int", prompt, timeout).await?;
        Seat::from_wire(reply.target)
    }

    /// The wolf kill round.
    ///
    /// Until `deadline` the player may chat: every free-discussion line is
    /// relayed to the rest of the pack as `"Seat N: text"`. An action
    /// response ends the round with its target.
    pub async fn kill(&self, deadline: Instant) -> Option<Seat> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let request = self.action_prompt(
            true,
            "int",
            "Choose tonight's victim. Free discussion now reaches your pack.",
            remaining,
        )?;

        self.peer.drain().await;
        if let Err(e) = self.peer.send(&request) {
            tracing::debug!(seat = %self.seat, error = %e, "kill prompt not sent");
            return None;
        }

        loop {
            let packet = match self.peer.receive_until(deadline).await {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::debug!(seat = %self.seat, error = %e, "kill round ended without a choice");
                    return None;
                }
            };
            match packet.kind() {
                PacketKind::ActionResponse => return Seat::from_wire(packet.int("target")?),
                PacketKind::FreeDiscussion => {
                    let line = format!(
                        "Seat {}: {}",
                        self.seat.0,
                        packet.str("content").unwrap_or_default()
                    );
                    for sibling in &self.pack {
                        let relayed = sibling
                            .packet(PacketKind::FreeDiscussion)
                            .field("content", line.as_str())
                            .build()
                            .map_err(SessionError::from)
                            .and_then(|p| sibling.send(&p));
                        if let Err(e) = relayed {
                            tracing::debug!(seat = %self.seat, to = %sibling.id(), error = %e, "chat relay failed");
                        }
                    }
                }
                other => {
                    tracing::debug!(seat = %self.seat, kind = %other, "ignoring packet during kill round");
                }
            }
        }
    }

    /// Handles this player dying.
    ///
    /// An Idiot exiled for the first time is revealed and survives instead:
    /// the counter is bumped (losing the vote) and `None` comes back.
    /// Otherwise the player is marked dead and told so. A police holder
    /// then gets a vote prompt whose candidate inherits the badge, and
    /// final words are asked for if `final_words` is set.
    pub async fn on_dead(
        &mut self,
        cause: DeathCause,
        final_words: bool,
        timeout: Duration,
    ) -> Option<DeathReport> {
        if cause == DeathCause::Exile && self.role.strategy().survives_exile(self.used) {
            self.used += 1;
            tracing::info!(seat = %self.seat, "idiot survives exile");
            return None;
        }

        self.alive = false;
        tracing::info!(seat = %self.seat, role = %self.role, %cause, "player died");
        self.inform_death();

        let successor = if self.police {
            self.vote(
                "Vote for the seat that inherits the police badge, or abstain to destroy it.",
                timeout,
            )
            .await
        } else {
            None
        };
        let final_words = if final_words {
            self.speak(timeout).await
        } else {
            None
        };

        Some(DeathReport {
            successor,
            final_words,
        })
    }
}

/// A time limit in whole seconds, saturating at `i64::MAX`.
fn whole_seconds(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds_truncates_fraction() {
        assert_eq!(whole_seconds(Duration::from_millis(2_999)), 2);
        assert_eq!(whole_seconds(Duration::ZERO), 0);
    }

    #[test]
    fn test_whole_seconds_huge_duration_saturates() {
        assert_eq!(whole_seconds(Duration::from_secs(u64::MAX)), i64::MAX);
        assert_eq!(whole_seconds(Duration::MAX), i64::MAX);
    }
}
