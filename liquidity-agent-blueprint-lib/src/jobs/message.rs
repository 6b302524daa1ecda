use std::sync::Arc;

use crate::inbound::{InboundHandler, InboundMessage};
use crate::reply::{ChannelOutbox, ReplyChannel};
use crate::tangle::extract::{Caller, TangleArg, TangleResult};
use crate::{AgentContext, AgentMessage, JsonResponse, agent};

/// Run one inbound message through the handler and collect its reply.
///
/// Each job gets its own outbox, so the single reply the handler emits is the
/// job result. A message that was dropped yields an error and no result.
pub async fn run_agent_message(
    ctx: &AgentContext,
    message: &InboundMessage,
) -> Result<JsonResponse, String> {
    let (outbox, mut replies) = ChannelOutbox::new();
    let reply = ReplyChannel::new(ctx.agent_address.clone(), Arc::new(outbox));
    let handler = InboundHandler::new(ctx.registry.clone(), reply)
        .with_reply_on_malformed(ctx.reply_on_malformed);

    handler.on_message(message).await;
    drop(handler);

    match replies.try_recv() {
        Ok(envelope) => Ok(JsonResponse {
            json: envelope.body,
        }),
        Err(_) => Err(format!(
            "Message from {} dropped: content is not valid JSON",
            message.sender
        )),
    }
}

pub async fn agent_message(
    Caller(caller): Caller,
    TangleArg(request): TangleArg<AgentMessage>,
) -> Result<TangleResult<JsonResponse>, String> {
    let sender = if request.sender.trim().is_empty() {
        super::caller_hex(&caller)
    } else {
        request.sender.trim().to_string()
    };
    let message = InboundMessage::new(sender, request.content);

    let response = run_agent_message(agent()?, &message).await?;
    Ok(TangleResult(response))
}
